//! Members repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{is_unique_violation, AppError, AppResult},
    models::{
        member::{CreateMember, Member, MemberQuery, MemberShort, UpdateMember},
        Page,
    },
};

const MEMBER_FILTER: &str = r#"
    WHERE m.is_deleted = FALSE
      AND ($1::text IS NULL OR m.first_name ILIKE '%' || $1 || '%' OR m.last_name ILIKE '%' || $1 || '%')
      AND ($2::text IS NULL OR LOWER(m.email) = LOWER($2))
"#;

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a non-deleted member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Search members with pagination
    pub async fn search(&self, query: &MemberQuery, page: Page) -> AppResult<(Vec<MemberShort>, i64)> {
        let count_query = format!("SELECT COUNT(*) FROM members m {}", MEMBER_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&query.name)
            .bind(&query.email)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            r#"
            SELECT m.id, m.first_name, m.last_name, m.email,
                   (SELECT COUNT(*) FROM loans l
                     WHERE l.member_id = m.id AND l.returned_at IS NULL) AS nb_open_loans,
                   (SELECT COUNT(*) FROM loans l
                     WHERE l.member_id = m.id AND l.returned_at IS NULL
                       AND l.due_date < CURRENT_DATE) AS nb_overdue_loans
            FROM members m
            {}
            ORDER BY m.last_name, m.first_name, m.id
            LIMIT $3 OFFSET $4
            "#,
            MEMBER_FILTER
        );

        let members = sqlx::query_as::<_, MemberShort>(&select_query)
            .bind(&query.name)
            .bind(&query.email)
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((members, total))
    }

    /// Create a new member
    pub async fn create(&self, member: &CreateMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (first_name, last_name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .fetch_one(&self.pool)
        .await
        .map_err(map_email_conflict)
    }

    /// Update a member, keeping the stored value of absent fields
    pub async fn update(&self, id: i32, member: &UpdateMember) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_email_conflict)?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Mark a member as deleted
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE members SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member with id {} not found", id)));
        }
        Ok(())
    }

    /// Number of open loans held by the member
    pub async fn count_open_loans(&self, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE member_id = $1 AND returned_at IS NULL",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count non-deleted members
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE is_deleted = FALSE")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_email_conflict(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err, "ux_members_email") {
        AppError::Conflict("A member with this email already exists".to_string())
    } else {
        AppError::Database(err)
    }
}
