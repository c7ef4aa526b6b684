//! Reading and writing documents as self-describing packages.

mod crypt;
mod encoding;
mod package;

pub use crypt::{DecryptionHandler, PasswordHandler, STANDARD_FILTER};
pub(crate) use encoding::{base64_bytes, base64_opt};
pub use package::{render, render_file, render_to, render_to_with, render_with, Reader, FORMAT_VERSION, MAGIC};
