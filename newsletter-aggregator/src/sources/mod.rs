pub mod news_feed;
pub mod serper;

pub use news_feed::NewsFeedSource;
pub use serper::SerperSource;
