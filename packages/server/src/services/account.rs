use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
};

use crate::entity::user;
use crate::identity::Identity;

pub struct AccountService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AccountService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Create the user on first login, otherwise refresh the display
    /// attributes. Posting permission is never touched for existing users.
    pub async fn upsert(
        &self,
        identity: &Identity,
        default_permission: bool,
    ) -> Result<user::Model, DbErr> {
        if let Some(existing) = self.find_by_external_id(&identity.external_id).await? {
            return self.refresh(existing, identity).await;
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            external_id: Set(identity.external_id.clone()),
            username: Set(identity.username.clone()),
            avatar: Set(identity.avatar.clone()),
            discriminator: Set(identity.discriminator.clone()),
            can_post: Set(default_permission),
            created_at: Set(now),
            last_login_at: Set(now),
            ..Default::default()
        };

        match model.insert(self.conn).await {
            Ok(created) => {
                tracing::info!(user_id = created.id, "New user registered");
                Ok(created)
            }
            // Two first logins raced; the other one created the row.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let existing = self
                    .find_by_external_id(&identity.external_id)
                    .await?
                    .ok_or_else(|| {
                        DbErr::Custom(
                            "UniqueConstraintViolation but existing user not found".to_string(),
                        )
                    })?;
                self.refresh(existing, identity).await
            }
            Err(e) => Err(e),
        }
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .one(self.conn)
            .await
    }

    async fn refresh(
        &self,
        existing: user::Model,
        identity: &Identity,
    ) -> Result<user::Model, DbErr> {
        let mut active: user::ActiveModel = existing.into();
        active.username = Set(identity.username.clone());
        active.avatar = Set(identity.avatar.clone());
        active.discriminator = Set(identity.discriminator.clone());
        active.last_login_at = Set(Utc::now());
        active.update(self.conn).await
    }
}
