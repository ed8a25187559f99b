pub mod books;
pub mod domain;
pub mod pagination;
pub mod ports;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use books::{BookError, BookResult, BookService, Caller, CreateBookInput};
pub use domain::{
    Book, BookOwner, BookPage, BookWithOwner, DomainError, ImagePayload, NewBook,
    Rating, UploadedImage, User, UserCredentials,
};
pub use pagination::PageRequest;
pub use ports::{DatabaseService, MediaStorageService, PortError, PortResult};
