mod builder;
mod language;
mod template;

pub use builder::{
    ActivityBuilder, DocumentProbe, FsProbe, APP_IMAGE_KEY, IDLE_IMAGE_KEY, INSIDERS_IMAGE_KEY,
    UNKNOWN_GIT_BRANCH, UNKNOWN_GIT_REPO_NAME,
};
pub use language::{IconRegistry, DEFAULT_ICON};
pub use template::{
    format_count, format_file_size, pad_text, substitute, to_lower, to_title, to_upper, Token,
    FAKE_EMPTY,
};
