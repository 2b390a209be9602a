/// Fatal errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to enumerate mounts: {0}")]
    Enumeration(#[from] crate::mountinfo::Error),
    #[error(transparent)]
    Notification(#[from] crate::fanotify::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }
}
