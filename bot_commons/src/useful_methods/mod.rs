mod send;
pub use send::*;

use futures::{Future, TryStreamExt};
use teloxide::{
    net::Download,
    requests::Requester,
    types::{FileMeta, Message, PhotoSize},
    Bot, RequestError,
};

pub trait MessageStuff {
    /// Text of the message, or its caption if it's a media message.
    fn text_full(&self) -> Option<&str>;
    /// The highest resolution version of the attached photo, if any.
    fn find_biggest_photo(&self) -> Option<&PhotoSize>;
}

impl MessageStuff for Message {
    fn text_full(&self) -> Option<&str> {
        self.text().or_else(|| self.caption())
    }
    fn find_biggest_photo(&self) -> Option<&PhotoSize> {
        self.photo()?
            .iter()
            .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
    }
}

pub trait BotStuff {
    /// Download the file into the provided buffer. Refuses files larger
    /// than `max_bytes`, returning `Ok(false)`.
    fn download_file_to_vec(
        &self,
        file: &FileMeta,
        to: &mut Vec<u8>,
        max_bytes: u32,
    ) -> impl Future<Output = Result<bool, RequestError>> + Send;
}

impl BotStuff for Bot {
    async fn download_file_to_vec(
        &self,
        file: &FileMeta,
        to: &mut Vec<u8>,
        max_bytes: u32,
    ) -> Result<bool, RequestError> {
        if file.size > max_bytes {
            return Ok(false);
        }

        let file = self.get_file(file.id.clone()).await?;
        let start = to.len();
        to.reserve(file.size as usize);
        let mut stream = self.download_file_stream(&file.path);

        while let Some(chunk) = stream.try_next().await? {
            to.extend_from_slice(&chunk);
            // Telegram's size was a lie.
            if to.len() - start > max_bytes as usize {
                to.truncate(start);
                return Ok(false);
            }
        }

        Ok(true)
    }
}
