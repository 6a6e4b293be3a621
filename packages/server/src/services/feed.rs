//! Read side: listings, tag search and post detail.

use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::{Expr, ExprTrait, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

use crate::entity::post::PostState;
use crate::entity::{comment, comment_like, post, post_attachment, post_image, post_like, user};
use crate::identity::avatar_url;
use crate::models::post::{
    AttachmentView, AuthorView, CommentView, ImageView, ListParams, PostDetail, PostSort,
    PostSummary,
};
use crate::models::shared::{Pagination, escape_like};
use crate::utils::hashtag::render_post_content;

pub struct FeedService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> FeedService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// One page of active posts, optionally restricted to a hashtag.
    ///
    /// Tag matching is a case-insensitive substring match on `#tag`, so
    /// `#rust` also matches posts tagged `#rustacean`.
    pub async fn list(
        &self,
        tag: Option<&str>,
        params: ListParams,
        viewer: Option<i32>,
    ) -> Result<(Vec<PostSummary>, Pagination), DbErr> {
        let mut select = post::Entity::find().filter(post::Column::State.eq(PostState::Active));

        if let Some(tag) = tag {
            let term = escape_like(&format!("#{}", tag.trim()).to_lowercase());
            select = select.filter(
                Expr::expr(Func::lower(Expr::col((post::Entity, post::Column::Content))))
                    .like(LikeExpr::new(format!("%{term}%")).escape('\\')),
            );
        }

        let total = select.clone().count(self.conn).await?;
        let pagination = Pagination::new(params.page, params.per_page, total);

        let Some(offset) = params.offset() else {
            return Ok((Vec::new(), pagination));
        };
        let posts = sorted(select, params.sort)
            .offset(Some(offset))
            .limit(Some(params.per_page))
            .all(self.conn)
            .await?;

        Ok((self.summarize(posts, viewer).await?, pagination))
    }

    /// Hidden posts, newest first, for the moderation queue.
    pub async fn hidden(&self) -> Result<Vec<PostSummary>, DbErr> {
        let posts = post::Entity::find()
            .filter(post::Column::State.eq(PostState::Hidden))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .all(self.conn)
            .await?;
        self.summarize(posts, None).await
    }

    /// A single post in any state, with its comments. `None` if it does not exist.
    pub async fn detail(&self, id: i32, viewer: Option<i32>) -> Result<Option<PostDetail>, DbErr> {
        let Some(found) = post::Entity::find_by_id(id).one(self.conn).await? else {
            return Ok(None);
        };
        let Some(summary) = self.summarize(vec![found], viewer).await?.pop() else {
            return Ok(None);
        };

        let comments = comment::Entity::find()
            .filter(comment::Column::PostId.eq(id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(self.conn)
            .await?;
        let comment_ids: Vec<i32> = comments.iter().map(|c| c.id).collect();
        let authors = self
            .authors(comments.iter().map(|c| c.user_id).collect())
            .await?;

        let like_counts: HashMap<i32, i64> = if comment_ids.is_empty() {
            HashMap::new()
        } else {
            comment_like::Entity::find()
                .select_only()
                .column(comment_like::Column::CommentId)
                .column_as(comment_like::Column::UserId.count(), "count")
                .filter(comment_like::Column::CommentId.is_in(comment_ids.clone()))
                .group_by(comment_like::Column::CommentId)
                .into_tuple::<(i32, i64)>()
                .all(self.conn)
                .await?
                .into_iter()
                .collect()
        };

        let liked: HashSet<i32> = match viewer {
            Some(user_id) if !comment_ids.is_empty() => comment_like::Entity::find()
                .select_only()
                .column(comment_like::Column::CommentId)
                .filter(comment_like::Column::UserId.eq(user_id))
                .filter(comment_like::Column::CommentId.is_in(comment_ids))
                .into_tuple::<i32>()
                .all(self.conn)
                .await?
                .into_iter()
                .collect(),
            _ => HashSet::new(),
        };

        let comments = comments
            .into_iter()
            .map(|c| {
                Ok(CommentView {
                    id: c.id,
                    author: author_of(&authors, c.user_id)?,
                    like_count: count_of(&like_counts, c.id),
                    liked: liked.contains(&c.id),
                    content: c.content,
                    created_at: c.created_at,
                })
            })
            .collect::<Result<Vec<_>, DbErr>>()?;

        Ok(Some(PostDetail {
            post: summary,
            comments,
        }))
    }

    /// Attach authors, counts, media and the viewer's likes to posts,
    /// keeping their order.
    async fn summarize(
        &self,
        posts: Vec<post::Model>,
        viewer: Option<i32>,
    ) -> Result<Vec<PostSummary>, DbErr> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();

        let authors = self.authors(posts.iter().map(|p| p.user_id).collect()).await?;

        let like_counts: HashMap<i32, i64> = post_like::Entity::find()
            .select_only()
            .column(post_like::Column::PostId)
            .column_as(post_like::Column::UserId.count(), "count")
            .filter(post_like::Column::PostId.is_in(ids.clone()))
            .group_by(post_like::Column::PostId)
            .into_tuple::<(i32, i64)>()
            .all(self.conn)
            .await?
            .into_iter()
            .collect();

        let comment_counts: HashMap<i32, i64> = comment::Entity::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(comment::Column::Id.count(), "count")
            .filter(comment::Column::PostId.is_in(ids.clone()))
            .group_by(comment::Column::PostId)
            .into_tuple::<(i32, i64)>()
            .all(self.conn)
            .await?
            .into_iter()
            .collect();

        let mut images: HashMap<i32, Vec<ImageView>> = HashMap::new();
        for image in post_image::Entity::find()
            .filter(post_image::Column::PostId.is_in(ids.clone()))
            .order_by_asc(post_image::Column::Id)
            .all(self.conn)
            .await?
        {
            images.entry(image.post_id).or_default().push(ImageView {
                url: format!("/uploads/images/{}", image.filename),
                filename: image.filename,
            });
        }

        let mut attachments: HashMap<i32, Vec<AttachmentView>> = HashMap::new();
        for file in post_attachment::Entity::find()
            .filter(post_attachment::Column::PostId.is_in(ids.clone()))
            .order_by_asc(post_attachment::Column::Id)
            .all(self.conn)
            .await?
        {
            attachments.entry(file.post_id).or_default().push(AttachmentView {
                id: file.id,
                url: format!("/uploads/files/{}", file.filename),
                original_filename: file.original_filename,
                content_type: file.content_type,
                size: file.size,
            });
        }

        let liked: HashSet<i32> = match viewer {
            Some(user_id) => post_like::Entity::find()
                .select_only()
                .column(post_like::Column::PostId)
                .filter(post_like::Column::UserId.eq(user_id))
                .filter(post_like::Column::PostId.is_in(ids))
                .into_tuple::<i32>()
                .all(self.conn)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        posts
            .into_iter()
            .map(|p| {
                Ok(PostSummary {
                    id: p.id,
                    author: author_of(&authors, p.user_id)?,
                    like_count: count_of(&like_counts, p.id),
                    comment_count: count_of(&comment_counts, p.id),
                    liked: liked.contains(&p.id),
                    images: images.remove(&p.id).unwrap_or_default(),
                    attachments: attachments.remove(&p.id).unwrap_or_default(),
                    content_html: render_post_content(&p.content),
                    title: p.title,
                    content: p.content,
                    state: p.state,
                    created_at: p.created_at,
                })
            })
            .collect()
    }

    async fn authors(&self, mut ids: Vec<i32>) -> Result<HashMap<i32, AuthorView>, DbErr> {
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|u| (u.id, author_view(&u)))
            .collect())
    }
}

pub fn author_view(user: &user::Model) -> AuthorView {
    AuthorView {
        id: user.id,
        username: user.username.clone(),
        avatar_url: avatar_url(
            &user.external_id,
            user.avatar.as_deref(),
            user.discriminator.as_deref(),
        ),
    }
}

/// Apply the sort order. Aggregate sorts fall back to newest first.
fn sorted(select: Select<post::Entity>, sort: PostSort) -> Select<post::Entity> {
    let select = match sort {
        PostSort::Newest => select,
        PostSort::Oldest => {
            return select
                .order_by_asc(post::Column::CreatedAt)
                .order_by_asc(post::Column::Id);
        }
        PostSort::MostLiked => select
            .left_join(post_like::Entity)
            .group_by(post::Column::Id)
            .order_by(post_like::Column::UserId.count(), Order::Desc),
        PostSort::MostCommented => select
            .left_join(comment::Entity)
            .group_by(post::Column::Id)
            .order_by(comment::Column::Id.count(), Order::Desc),
    };
    select
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
}

fn author_of(authors: &HashMap<i32, AuthorView>, id: i32) -> Result<AuthorView, DbErr> {
    authors
        .get(&id)
        .cloned()
        .ok_or_else(|| DbErr::RecordNotFound(format!("user {id}")))
}

fn count_of(counts: &HashMap<i32, i64>, id: i32) -> u64 {
    Ord::max(counts.get(&id).copied().unwrap_or(0), 0) as u64
}
