// Configuration item endpoints
//
// Read, write, and invoke methods on items in the configuration tree.

use tracing::debug;

use crate::client::ConfigClient;
use crate::error::Error;
use crate::models::{ConfigItem, InvokeRequest};

impl ConfigClient {
    /// Fetch a single item by path.
    ///
    /// `GET /api/items?path={path}`
    pub async fn get_item(&self, path: &str) -> Result<ConfigItem, Error> {
        let url = self.item_url("items", path)?;
        let items: Vec<ConfigItem> = self.get(url).await.map_err(|e| not_found(e, path))?;
        items.into_iter().next().ok_or_else(|| Error::NotFound {
            path: path.to_owned(),
        })
    }

    /// List the direct children of a folder item.
    ///
    /// `GET /api/items/children?path={path}`
    pub async fn get_child_items(&self, path: &str) -> Result<Vec<ConfigItem>, Error> {
        let url = self.item_url("items/children", path)?;
        let items: Vec<ConfigItem> = self.get(url).await.map_err(|e| not_found(e, path))?;
        debug!(path, count = items.len(), "listed child items");
        Ok(items)
    }

    /// Invoke a named method on an item and return the resulting item.
    ///
    /// `POST /api/items/invoke` with `{path, method}`
    pub async fn invoke_method(&self, path: &str, method: &str) -> Result<ConfigItem, Error> {
        let url = self.api_url("items/invoke")?;
        let items: Vec<ConfigItem> = self.post(url, &InvokeRequest { path, method }).await?;
        items.into_iter().next().ok_or_else(|| Error::EmptyResponse {
            endpoint: format!("items/invoke ({method})"),
        })
    }

    /// Persist an item's properties.
    ///
    /// `PUT /api/items`. Field-level rejections surface as
    /// [`Error::Validation`].
    pub async fn save_item(&self, item: &ConfigItem) -> Result<(), Error> {
        let url = self.api_url("items")?;
        let _: Vec<serde_json::Value> = self.put(url, item).await?;
        debug!(path = %item.path, "item saved");
        Ok(())
    }
}

fn not_found(err: Error, path: &str) -> Error {
    if err.is_not_found() {
        Error::NotFound {
            path: path.to_owned(),
        }
    } else {
        err
    }
}
