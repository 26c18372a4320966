pub mod account;
pub mod comment;
pub mod post;

pub use account::{
    Account, AccountCard, BookmarkCard, CreateAccount, Credentials, OwnProfile, PublicProfile,
    UpdateProfile,
};
pub use comment::{Comment, CommentView, CreateComment, UpdateComment};
pub use post::{CreatePost, Post, PostDetail, PostStatus, PostSummary, TagCount, UpdatePost};
