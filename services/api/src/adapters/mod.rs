pub mod cloudinary;
pub mod db;

pub use cloudinary::CloudinaryAdapter;
pub use db::DbAdapter;
