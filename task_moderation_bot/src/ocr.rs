use futures::future::BoxFuture;
use reqwest::Client;
use url::Url;

use crate::error::OcrError;

/// Reads text off images.
pub trait OcrService: Send + Sync {
    /// `Ok(None)` if there's no text on the image.
    fn extract_text(&self, image: Vec<u8>) -> BoxFuture<'_, Result<Option<String>, OcrError>>;
}

/// Talks to an OCR server that takes the image as a multipart `file` field
/// and answers with plain text.
pub struct HttpOcr {
    client: Client,
    endpoint: Url,
}

impl HttpOcr {
    pub fn new(endpoint: Url) -> Self {
        HttpOcr {
            client: Client::new(),
            endpoint,
        }
    }

    async fn request(&self, image: Vec<u8>) -> Result<Option<String>, OcrError> {
        let form_data = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(image).file_name("image.jpg"),
            );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form_data)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

impl OcrService for HttpOcr {
    fn extract_text(&self, image: Vec<u8>) -> BoxFuture<'_, Result<Option<String>, OcrError>> {
        Box::pin(self.request(image))
    }
}
