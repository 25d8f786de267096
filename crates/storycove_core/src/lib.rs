pub mod aggregate;
pub mod domain;
pub mod ports;

pub use domain::{
    Category, CategoryPatch, Comment, CommentTarget, NewCategory, NewComment, NewPage, NewStory,
    Page, PageDetail, PagePatch, Rating, Reader, Story, StoryDetail, StoryOverview, StoryPatch, StoryStats,
    StoryStatus, User, UserCredentials,
};
pub use ports::{CoreError, CoreResult, NoopFinalizer, UploadFinalizer};
