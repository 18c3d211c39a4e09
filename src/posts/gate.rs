use time::{Duration, OffsetDateTime};

use crate::store::{Post, User};

/// How long a fresh post stays hidden from viewers who have not earned
/// immediate viewing.
pub const VISIBILITY_DELAY: Duration = Duration::hours(24);

/// Posting inside this window earns immediate viewing.
pub const PARTICIPATION_WINDOW: Duration = Duration::days(7);

/// True once the post has aged past the 24-hour delay.
pub fn is_delay_elapsed(created_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    now - created_at >= VISIBILITY_DELAY
}

/// True iff the viewer is authenticated and has posted within the last
/// 7 days. Computed live from `last_posted` on every call; there is no
/// cached flag to go stale.
pub fn qualifies_for_immediate_view(viewer: Option<&User>, now: OffsetDateTime) -> bool {
    viewer
        .and_then(|u| u.last_posted)
        .map(|last| now - last <= PARTICIPATION_WINDOW)
        .unwrap_or(false)
}

/// The whole gate: a post may be shown when it is old enough for everyone,
/// or the viewer has earned immediate viewing. Pure and side-effect free —
/// it runs once per post in every listing.
pub fn visible_now(post: &Post, viewer: Option<&User>, now: OffsetDateTime) -> bool {
    is_delay_elapsed(post.created_at, now) || qualifies_for_immediate_view(viewer, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PostStatus;
    use time::macros::datetime;
    use uuid::Uuid;

    fn user_with_last_posted(last_posted: Option<OffsetDateTime>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: datetime!(2024-01-01 00:00 UTC),
            last_posted,
            kudos: 0,
        }
    }

    fn post_created_at(created_at: OffsetDateTime) -> Post {
        Post {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            location: "Maple St curb".to_string(),
            latitude: "52.520008".to_string(),
            longitude: "13.404954".to_string(),
            description: None,
            status: PostStatus::Available,
            created_at,
            updated_at: created_at,
        }
    }

    const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

    #[test]
    fn old_posts_are_visible_to_anyone() {
        let post = post_created_at(NOW - Duration::hours(25));
        assert!(visible_now(&post, None, NOW));
        let never_posted = user_with_last_posted(None);
        assert!(visible_now(&post, Some(&never_posted), NOW));
    }

    #[test]
    fn delay_boundary_is_inclusive_at_exactly_24_hours() {
        let post = post_created_at(NOW - Duration::hours(24));
        assert!(visible_now(&post, None, NOW));
        let younger = post_created_at(NOW - Duration::hours(24) + Duration::seconds(1));
        assert!(!visible_now(&younger, None, NOW));
    }

    #[test]
    fn young_posts_are_hidden_from_anonymous_viewers() {
        let post = post_created_at(NOW - Duration::hours(1));
        assert!(!visible_now(&post, None, NOW));
    }

    #[test]
    fn young_posts_are_hidden_from_users_who_never_posted() {
        let post = post_created_at(NOW - Duration::hours(1));
        let viewer = user_with_last_posted(None);
        assert!(!visible_now(&post, Some(&viewer), NOW));
    }

    #[test]
    fn recent_posters_see_young_posts_immediately() {
        let post = post_created_at(NOW - Duration::hours(1));
        let viewer = user_with_last_posted(Some(NOW - Duration::days(2)));
        assert!(visible_now(&post, Some(&viewer), NOW));
    }

    #[test]
    fn qualification_expires_after_seven_days() {
        let at_boundary = user_with_last_posted(Some(NOW - Duration::days(7)));
        assert!(qualifies_for_immediate_view(Some(&at_boundary), NOW));

        let lapsed = user_with_last_posted(Some(NOW - Duration::days(7) - Duration::minutes(1)));
        assert!(!qualifies_for_immediate_view(Some(&lapsed), NOW));

        let post = post_created_at(NOW - Duration::hours(1));
        assert!(!visible_now(&post, Some(&lapsed), NOW));
    }
}
