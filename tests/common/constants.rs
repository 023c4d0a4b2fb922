//! Shared constants for end-to-end tests
//!
//! When the fixture catalog changes, update only this file and `fixtures.rs`.
#![allow(dead_code)]

// ============================================================================
// Users
// ============================================================================

/// Has a profile named "Alice"
pub const USER_ALICE: &str = "alice";
pub const USER_ALICE_NAME: &str = "Alice";

/// Has no profile row
pub const USER_BOB: &str = "bob";

// ============================================================================
// Series
// ============================================================================

/// "Naruto", rated 8.5, declares 3 episodes of which 2 are stored
pub const SERIES_NARUTO_ID: &str = "series-naruto";
pub const SERIES_NARUTO_TITLE: &str = "Naruto";
pub const SERIES_NARUTO_EPISODES: u32 = 3;

/// "Bleach", rated 8.0
pub const SERIES_BLEACH_ID: &str = "series-bleach";
pub const SERIES_BLEACH_TITLE: &str = "Bleach";

/// "Mushishi", rated 9.0
pub const SERIES_MUSHISHI_ID: &str = "series-mushishi";

/// Highest rated series, but archived
pub const SERIES_ARCHIVED_ID: &str = "series-archived";

// ============================================================================
// Films
// ============================================================================

/// "Spirited Away", rated 9.3, links in English (untagged) and Japanese
pub const FILM_SPIRITED_ID: &str = "film-spirited";

/// "Akira", rated 8.1, no links
pub const FILM_AKIRA_ID: &str = "film-akira";

pub const FILM_ARCHIVED_ID: &str = "film-archived";

// ============================================================================
// Episodes and links
// ============================================================================

pub const NARUTO_EP1_ID: &str = "naruto-ep-1";
pub const NARUTO_EP2_ID: &str = "naruto-ep-2";

pub const STREAMER_X: &str = "StreamerX";
pub const STREAMER_X_OLD_URL: &str = "https://streamerx.example/naruto/1?v=1";
pub const STREAMER_X_NEW_URL: &str = "https://streamerx.example/naruto/1?v=2";

// ============================================================================
// Comments
// ============================================================================

/// Alice's comment on Naruto, oldest
pub const COMMENT_ALICE_ID: &str = "comment-alice";

/// Bob's comment on Naruto, newest
pub const COMMENT_BOB_ID: &str = "comment-bob";

/// How long the scripted backend takes for a delayed query
pub const SLOW_QUERY_MS: u64 = 400;
