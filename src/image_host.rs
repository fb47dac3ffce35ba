use anyhow::anyhow;
use async_trait::async_trait;

use crate::repositories::{RepositoryError, Result};

/// takes a base64-encoded image, hands back the public URL it is served from.
#[async_trait]
pub trait ImageHost {
    async fn upload(&self, image_base64: String) -> Result<String>;
}

/// stands in when no image host is configured; every upload fails.
pub struct NoImageHost;

#[async_trait]
impl ImageHost for NoImageHost {
    async fn upload(&self, _: String) -> Result<String> {
        Err(RepositoryError::Internal(anyhow!("no image host configured.")))
    }
}
