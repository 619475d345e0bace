pub mod controller;
pub mod header;
pub mod presenter;
pub mod session;
pub mod validator;

pub use crate::domain::model::{
    CriteriaSpec, NotificationRequest, RequestId, ResultRow, SubmissionRequest, SubmissionResult,
    UploadedDataset,
};
pub use crate::domain::ports::{NotificationRelay, ScoringService, ServiceConfig};
pub use crate::utils::error::Result;
