use crate::models::pilot::Pilot;
use crate::utils::errors::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PilotRepository {
    pool: PgPool,
}

impl PilotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Pilot>> {
        let pilot = sqlx::query_as::<_, Pilot>("SELECT * FROM pilots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pilot)
    }
}
