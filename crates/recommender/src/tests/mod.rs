//! Scenario tests for the ranking policy

mod similar_posts_test;

use crate::store::InteractionSnapshot;
use crate::types::{Like, Post, PostId, UserId, Visit};
use chrono::{DateTime, TimeZone, Utc};

/// Posts created one day apart, so a higher id is newer
pub(crate) fn created(day: PostId) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(day)
}

pub(crate) fn post(id: PostId, category: Option<&str>) -> Post {
    Post {
        id,
        category: category.map(str::to_string),
        title: format!("Post {}", id),
        content_length: 1000,
        created_at: created(id),
    }
}

pub(crate) fn like(user_id: UserId, post_id: PostId) -> Like {
    Like {
        user_id,
        post_id,
        created_at: created(0),
    }
}

pub(crate) fn user_visit(post_id: PostId, user_id: UserId) -> Visit {
    Visit {
        post_id,
        user_id: Some(user_id),
        ip_address: None,
        created_at: created(0),
    }
}

pub(crate) fn anonymous_visit(post_id: PostId, ip: &str) -> Visit {
    Visit {
        post_id,
        user_id: None,
        ip_address: Some(ip.to_string()),
        created_at: created(0),
    }
}

pub(crate) fn snapshot(posts: Vec<Post>, likes: Vec<Like>, visits: Vec<Visit>) -> InteractionSnapshot {
    let mut users: Vec<UserId> = likes
        .iter()
        .map(|l| l.user_id)
        .chain(visits.iter().filter_map(|v| v.user_id))
        .collect();
    users.sort_unstable();
    users.dedup();
    InteractionSnapshot::new(users, posts, likes, visits)
}

pub(crate) fn ids(summaries: &[crate::types::PostSummary]) -> Vec<PostId> {
    summaries.iter().map(|s| s.id).collect()
}
