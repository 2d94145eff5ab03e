use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("color palette has no entry named {0:?}")]
    MissingColor(String),
    #[error("blend set {set} is missing weight {key:?}")]
    MissingBlendWeight { set: &'static str, key: &'static str },
}
