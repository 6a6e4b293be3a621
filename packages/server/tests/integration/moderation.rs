use reqwest::multipart::{Form, Part};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use corkboard::entity::post::PostState;
use corkboard::entity::{comment, comment_like, post, post_attachment, post_image, post_like};

use crate::common::{TestApp, routes};

async fn state_of(app: &TestApp, post_id: i32) -> Option<PostState> {
    post::Entity::find_by_id(post_id)
        .one(&app.db)
        .await
        .unwrap()
        .map(|p| p.state)
}

mod soft_delete {
    use super::*;

    #[tokio::test]
    async fn moderator_hides_post_from_listings() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;
        let post_id = app.create_post(&alice, "Spam here", "buy #stuff").await;

        let res = app
            .post_form(&routes::soft_delete(post_id), &[], Some(&moderator))
            .await;

        res.assert_redirect("/");
        assert_eq!(res.notice().as_deref(), Some("Post deleted."));
        assert_eq!(state_of(&app, post_id).await, Some(PostState::Hidden));

        let home = app.get(routes::HOME, None).await;
        assert!(!home.text.contains("Spam here"));
        let tagged = app.get(&routes::tag("stuff"), None).await;
        assert!(!tagged.text.contains("Spam here"));
    }

    #[tokio::test]
    async fn hidden_post_is_still_addressable_with_banner() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;
        let post_id = app.create_post(&alice, "Borderline", "hmm").await;
        app.post_form(&routes::soft_delete(post_id), &[], Some(&moderator))
            .await;

        let page = app.get(&routes::post(post_id), None).await;

        assert_eq!(page.status, 200);
        assert!(page.text.contains("Borderline"));
        assert!(page.text.contains("This post has been hidden by a moderator."));
    }

    #[tokio::test]
    async fn non_moderator_gets_notice_and_nothing_changes() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let post_id = app.create_post(&alice, "Mine", "body").await;

        let res = app
            .post_form(&routes::soft_delete(post_id), &[], Some(&alice))
            .await;

        res.assert_redirect("/");
        assert_eq!(
            res.notice().as_deref(),
            Some("You don't have permission to do that.")
        );
        assert_eq!(state_of(&app, post_id).await, Some(PostState::Active));
    }

    #[tokio::test]
    async fn hiding_missing_post_is_404() {
        let app = TestApp::spawn().await;
        let moderator = app.login("mod").await;

        let res = app
            .post_form(&routes::soft_delete(404), &[], Some(&moderator))
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn anonymous_is_sent_to_login() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let post_id = app.create_post(&alice, "Mine", "body").await;

        app.post_form(&routes::soft_delete(post_id), &[], None)
            .await
            .assert_redirect(routes::LOGIN);
        assert_eq!(state_of(&app, post_id).await, Some(PostState::Active));
    }
}

mod restore {
    use super::*;

    #[tokio::test]
    async fn moderator_restores_hidden_post() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;
        let post_id = app.create_post(&alice, "Back again", "body").await;
        app.post_form(&routes::soft_delete(post_id), &[], Some(&moderator))
            .await;

        let res = app
            .post_form(&routes::restore(post_id), &[], Some(&moderator))
            .await;

        res.assert_redirect(routes::MODERATION);
        assert_eq!(res.notice().as_deref(), Some("Post restored."));
        assert_eq!(state_of(&app, post_id).await, Some(PostState::Active));
        let home = app.get(routes::HOME, None).await;
        assert!(home.text.contains("Back again"));
    }

    #[tokio::test]
    async fn non_moderator_is_forbidden() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;
        let post_id = app.create_post(&alice, "Stays hidden", "body").await;
        app.post_form(&routes::soft_delete(post_id), &[], Some(&moderator))
            .await;

        let res = app
            .post_form(&routes::restore(post_id), &[], Some(&alice))
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        assert_eq!(state_of(&app, post_id).await, Some(PostState::Hidden));
    }
}

mod hard_delete {
    use super::*;

    #[tokio::test]
    async fn purge_removes_every_dependent_row_and_file() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;

        let form = Form::new()
            .text("title", "Doomed")
            .text("content", "with media")
            .part(
                "attachment",
                Part::bytes(b"img".to_vec())
                    .file_name("pic.png")
                    .mime_str("image/png")
                    .unwrap(),
            )
            .part(
                "attachment",
                Part::bytes(b"doc".to_vec())
                    .file_name("notes.txt")
                    .mime_str("text/plain")
                    .unwrap(),
            );
        app.post_multipart(routes::CREATE, form, Some(&alice))
            .await
            .assert_redirect("/");
        let post_id = app.latest_post().await.unwrap().id;

        app.post_form(&routes::comment(post_id), &[("comment", "rip")], Some(&alice))
            .await;
        let comment_id = comment::Entity::find().one(&app.db).await.unwrap().unwrap().id;
        app.post_form(&routes::like_comment(comment_id), &[], Some(&alice))
            .await;
        app.post_form(&routes::like_post(post_id), &[], Some(&moderator))
            .await;
        assert_eq!(app.stored_files("images"), 1);
        assert_eq!(app.stored_files("files"), 1);

        let res = app
            .post_form(&routes::hard_delete(post_id), &[], Some(&moderator))
            .await;

        res.assert_redirect(routes::MODERATION);
        assert_eq!(
            res.notice().as_deref(),
            Some("Post and media permanently deleted.")
        );
        assert_eq!(state_of(&app, post_id).await, None);
        assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(comment_like::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(post_like::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(post_image::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(
            post_attachment::Entity::find().count(&app.db).await.unwrap(),
            0
        );
        assert_eq!(app.stored_files("images"), 0);
        assert_eq!(app.stored_files("files"), 0);

        assert_eq!(app.get(&routes::post(post_id), None).await.status, 404);
    }

    #[tokio::test]
    async fn purge_leaves_other_posts_alone() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;
        let doomed = app.create_post(&alice, "Doomed", "x").await;
        let kept = app.create_post(&alice, "Kept", "y").await;
        app.post_form(&routes::like_post(kept), &[], Some(&alice)).await;

        app.post_form(&routes::hard_delete(doomed), &[], Some(&moderator))
            .await
            .assert_redirect(routes::MODERATION);

        assert_eq!(state_of(&app, kept).await, Some(PostState::Active));
        let likes = post_like::Entity::find()
            .filter(post_like::Column::PostId.eq(kept))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(likes, 1);
    }

    #[tokio::test]
    async fn non_moderator_is_forbidden() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let post_id = app.create_post(&alice, "Mine", "body").await;

        let res = app
            .post_form(&routes::hard_delete(post_id), &[], Some(&alice))
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(state_of(&app, post_id).await, Some(PostState::Active));
    }

    #[tokio::test]
    async fn purging_missing_post_is_404() {
        let app = TestApp::spawn().await;
        let moderator = app.login("mod").await;

        let res = app
            .post_form(&routes::hard_delete(77), &[], Some(&moderator))
            .await;

        assert_eq!(res.status, 404);
    }
}

mod comments {
    use super::*;

    #[tokio::test]
    async fn moderator_deletes_comment_and_its_likes() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;
        let post_id = app.create_post(&alice, "Thread", "body").await;
        app.post_form(&routes::comment(post_id), &[("comment", "rude")], Some(&alice))
            .await;
        let comment_id = comment::Entity::find().one(&app.db).await.unwrap().unwrap().id;
        app.post_form(&routes::like_comment(comment_id), &[], Some(&alice))
            .await;

        let res = app
            .post_form(&routes::delete_comment(comment_id), &[], Some(&moderator))
            .await;

        res.assert_redirect(&routes::post(post_id));
        assert_eq!(res.notice().as_deref(), Some("Comment deleted."));
        assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(comment_like::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn author_cannot_delete_comment() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let post_id = app.create_post(&alice, "Thread", "body").await;
        app.post_form(&routes::comment(post_id), &[("comment", "mine")], Some(&alice))
            .await;
        let comment_id = comment::Entity::find().one(&app.db).await.unwrap().unwrap().id;

        let res = app
            .post_form(&routes::delete_comment(comment_id), &[], Some(&alice))
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 1);
    }
}

mod permissions {
    use super::*;

    #[tokio::test]
    async fn moderator_toggles_posting_both_ways() {
        let app = TestApp::spawn().await;
        let bob = app.login("bob").await;
        let moderator = app.login("mod").await;

        let res = app
            .post_form(&routes::toggle_permission(bob.user_id), &[], Some(&moderator))
            .await;
        res.assert_redirect(routes::MODERATION);
        assert_eq!(res.notice().as_deref(), Some("Posting enabled for bob."));
        assert!(app.user_by_external_id("200").await.can_post);

        // Takes effect on bob's very next request.
        app.create_post(&bob, "Finally", "I can post").await;

        let res = app
            .post_form(&routes::toggle_permission(bob.user_id), &[], Some(&moderator))
            .await;
        assert_eq!(res.notice().as_deref(), Some("Posting disabled for bob."));
        assert!(!app.user_by_external_id("200").await.can_post);
    }

    #[tokio::test]
    async fn non_moderator_cannot_toggle() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let bob = app.login("bob").await;

        let res = app
            .post_form(&routes::toggle_permission(bob.user_id), &[], Some(&alice))
            .await;

        assert_eq!(res.status, 403);
        assert!(!app.user_by_external_id("200").await.can_post);
    }

    #[tokio::test]
    async fn toggling_missing_user_is_404() {
        let app = TestApp::spawn().await;
        let moderator = app.login("mod").await;

        let res = app
            .post_form(&routes::toggle_permission(9999), &[], Some(&moderator))
            .await;

        assert_eq!(res.status, 404);
    }
}

mod dashboard {
    use super::*;

    #[tokio::test]
    async fn lists_hidden_posts_and_users() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        app.login("bob").await;
        let moderator = app.login("mod").await;
        let post_id = app.create_post(&alice, "Hidden gem", "body").await;
        app.create_post(&alice, "Visible one", "body").await;
        app.post_form(&routes::soft_delete(post_id), &[], Some(&moderator))
            .await;

        let page = app.get(routes::MODERATION, Some(&moderator)).await;

        assert_eq!(page.status, 200);
        assert!(page.text.contains("Hidden gem"));
        assert!(!page.text.contains("Visible one"));
        assert!(page.text.contains(&format!("/restore_post/{post_id}")));
        for name in ["alice", "bob", "moddy"] {
            assert!(page.text.contains(name), "missing user {name}");
        }
        assert!(page.text.contains("Disable posting"));
        assert!(page.text.contains("Enable posting"));
    }

    #[tokio::test]
    async fn empty_dashboard() {
        let app = TestApp::spawn().await;
        let moderator = app.login("mod").await;

        let page = app.get(routes::MODERATION, Some(&moderator)).await;

        assert!(page.text.contains("No hidden posts."));
    }

    #[tokio::test]
    async fn non_moderator_is_forbidden() {
        let app = TestApp::spawn().await;
        let alice = app.login("alice").await;

        assert_eq!(app.get(routes::MODERATION, Some(&alice)).await.status, 403);
        app.get(routes::MODERATION, None)
            .await
            .assert_redirect(routes::LOGIN);
    }

    #[tokio::test]
    async fn moderator_sees_controls_and_badge() {
        let app = TestApp::spawn().await;
        let alice = app.poster("alice").await;
        let moderator = app.login("mod").await;
        let post_id = app.create_post(&alice, "Anything", "body").await;

        let page = app.get(routes::HOME, Some(&moderator)).await;
        assert!(page.text.contains(&format!("/delete_post/{post_id}")));
        assert!(page.text.contains("class=\"badge\""));

        let page = app.get(routes::HOME, Some(&alice)).await;
        assert!(!page.text.contains(&format!("/delete_post/{post_id}")));
    }
}
