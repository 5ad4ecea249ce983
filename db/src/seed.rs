use sqlx::PgPool;
use uuid::Uuid;

/// Seeds the database with a pair of jobs so a freshly started stack has
/// something for the scheduler to pick up: a cron job firing every minute
/// and an immediately due one-off.
pub async fn seed_database(db: &PgPool) -> anyhow::Result<()> {
    let project_id = Uuid::new_v4();
    let pipeline_id = Uuid::new_v4();

    sqlx::query(
        r"
        INSERT INTO jobs (project_id, pipeline_id, schedule, next_run_at)
        VALUES ($1, $2, '* * * * *', now())
        ",
    )
    .bind(project_id)
    .bind(pipeline_id)
    .execute(db)
    .await?;

    sqlx::query(
        r"
        INSERT INTO jobs (project_id, pipeline_id, schedule, next_run_at)
        VALUES ($1, $2, NULL, now())
        ",
    )
    .bind(project_id)
    .bind(pipeline_id)
    .execute(db)
    .await?;

    Ok(())
}
