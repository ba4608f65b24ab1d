mod uploaded_file;

pub use uploaded_file::{
    Metadata, NewUploadedFile, UploadOptions, UploadResult, UploadedFile, UrlOptions,
};
