pub mod blocklist;

pub use blocklist::UrlBlocklist;
