use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
