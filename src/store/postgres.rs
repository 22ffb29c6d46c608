// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use super::{AssessmentStore, ProctorSessionRecord, SessionRecordStatus, StoreError};
use crate::assessment::{
    AnswerValue, CompletionFlags, QuestionId, Round, RoundSubmission, SessionSummary,
    ViolationCounts, WeightingRecord,
};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlagsRow {
    mcq_completed: bool,
    psychometric_completed: bool,
    text_based_completed: bool,
    coding_completed: bool,
}

#[derive(sqlx::FromRow)]
struct DraftRow {
    question_id: i64,
    answer: Json<AnswerValue>,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_uuid: Uuid,
    candidate_id: i64,
    assessment_id: Option<i64>,
    status: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    event_count: i64,
    violation_counts: Json<ViolationCounts>,
}

impl From<SessionRow> for ProctorSessionRecord {
    fn from(row: SessionRow) -> Self {
        let status = if row.status == SessionRecordStatus::Completed.as_str() {
            SessionRecordStatus::Completed
        } else {
            SessionRecordStatus::Active
        };
        Self {
            session_id: row.session_uuid,
            candidate_id: row.candidate_id,
            assessment_id: row.assessment_id,
            status,
            start_time: row.start_time,
            end_time: row.end_time,
            event_count: row.event_count,
            violation_counts: row.violation_counts.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CriteriaRow {
    technical_skill: f64,
    psychometric_assessment: f64,
    soft_skill: f64,
    fairplay: f64,
    is_default: bool,
}

const SESSION_COLUMNS: &str = "session_uuid, candidate_id, assessment_id, status, start_time, \
     end_time, event_count, violation_counts";

#[async_trait]
impl AssessmentStore for PgStore {
    async fn completion_flags(&self, candidate_id: i64) -> Result<CompletionFlags, StoreError> {
        let row = sqlx::query_as::<_, FlagsRow>(
            r#"
            SELECT mcq_completed, psychometric_completed, text_based_completed, coding_completed
            FROM candidates
            WHERE id = $1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("candidate {}", candidate_id)))?;

        Ok(CompletionFlags {
            mcq: row.mcq_completed,
            psychometric: row.psychometric_completed,
            text_based: row.text_based_completed,
            coding: row.coding_completed,
        })
    }

    async fn draft_answers(
        &self,
        candidate_id: i64,
        round: Round,
    ) -> Result<HashMap<QuestionId, AnswerValue>, StoreError> {
        let rows = sqlx::query_as::<_, DraftRow>(
            r#"
            SELECT question_id, answer
            FROM round_answers
            WHERE candidate_id = $1 AND round = $2 AND is_final = FALSE AND answer IS NOT NULL
            "#,
        )
        .bind(candidate_id)
        .bind(round.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.question_id, row.answer.0))
            .collect())
    }

    async fn save_draft_answer(
        &self,
        candidate_id: i64,
        round: Round,
        question_id: QuestionId,
        value: &AnswerValue,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO round_answers (candidate_id, round, question_id, answer, is_final)
            VALUES ($1, $2, $3, $4, FALSE)
            ON CONFLICT (candidate_id, round, question_id) DO UPDATE SET
                answer = EXCLUDED.answer,
                answered_at = NOW()
            WHERE round_answers.is_final = FALSE
            "#,
        )
        .bind(candidate_id)
        .bind(round.as_str())
        .bind(question_id)
        .bind(Json(value))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("round {} already submitted", round)));
        }
        Ok(())
    }

    async fn submit_round_answers(
        &self,
        candidate_id: i64,
        submission: &RoundSubmission,
    ) -> Result<(), StoreError> {
        let round = submission.round;
        let mut tx = self.pool.begin().await?;

        // Column names come from a closed enum, never from input.
        let flip = format!(
            "UPDATE candidates SET {col}_completed = TRUE, {col}_completed_at = $2 \
             WHERE id = $1 AND {col}_completed = FALSE",
            col = round.as_str()
        );
        let flipped = sqlx::query(&flip)
            .bind(candidate_id)
            .bind(submission.completed_at)
            .execute(&mut *tx)
            .await?;

        if flipped.rows_affected() == 0 {
            let exists = sqlx::query("SELECT id FROM candidates WHERE id = $1")
                .bind(candidate_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => StoreError::Conflict(format!("round {} already completed", round)),
                None => StoreError::NotFound(format!("candidate {}", candidate_id)),
            });
        }

        sqlx::query("DELETE FROM round_answers WHERE candidate_id = $1 AND round = $2")
            .bind(candidate_id)
            .bind(round.as_str())
            .execute(&mut *tx)
            .await?;

        if !submission.answers.is_empty() {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO round_answers (candidate_id, round, question_id, answer, is_final, answered_at) ",
            );
            query_builder.push_values(&submission.answers, |mut row, (question_id, answer)| {
                row.push_bind(candidate_id)
                    .push_bind(round.as_str())
                    .push_bind(*question_id)
                    .push_bind(answer.as_ref().map(Json))
                    .push_bind(true)
                    .push_bind(submission.completed_at);
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn open_proctor_session(
        &self,
        candidate_id: i64,
        session_id: Uuid,
        assessment_id: Option<i64>,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO proctor_sessions (session_uuid, candidate_id, assessment_id, status, start_time)
            VALUES ($1, $2, $3, 'active', $4)
            "#,
        )
        .bind(session_id)
        .bind(candidate_id)
        .bind(assessment_id)
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound(format!("candidate {}", candidate_id))
            }
            e => StoreError::from(e),
        })?;
        Ok(())
    }

    async fn close_proctor_session(&self, summary: &SessionSummary) -> Result<(), StoreError> {
        let Some(session_id) = summary.session_id else {
            return Ok(());
        };

        let result = sqlx::query(
            r#"
            UPDATE proctor_sessions SET
                status = 'completed',
                end_time = $2,
                event_count = $3,
                violation_counts = $4
            WHERE session_uuid = $1
            "#,
        )
        .bind(session_id)
        .bind(summary.ended_at)
        .bind(summary.event_count as i64)
        .bind(Json(summary.counts()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("proctor session {}", session_id)));
        }
        Ok(())
    }

    async fn proctor_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<ProctorSessionRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM proctor_sessions WHERE session_uuid = $1",
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ProctorSessionRecord::from))
    }

    async fn candidate_sessions(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<ProctorSessionRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM proctor_sessions WHERE candidate_id = $1 ORDER BY start_time DESC",
            SESSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(candidate_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ProctorSessionRecord::from).collect())
    }

    async fn weighting(&self, recruiter_id: i64) -> Result<Option<WeightingRecord>, StoreError> {
        let row = sqlx::query_as::<_, CriteriaRow>(
            r#"
            SELECT technical_skill, psychometric_assessment, soft_skill, fairplay, is_default
            FROM evaluation_criteria
            WHERE recruiter_id = $1
            "#,
        )
        .bind(recruiter_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| WeightingRecord {
            technical_skill: r.technical_skill,
            psychometric_assessment: r.psychometric_assessment,
            soft_skill: r.soft_skill,
            fairplay: r.fairplay,
            is_default: r.is_default,
        }))
    }

    async fn save_weighting(
        &self,
        recruiter_id: i64,
        record: &WeightingRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_criteria
                (recruiter_id, technical_skill, psychometric_assessment, soft_skill, fairplay, is_default)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (recruiter_id) DO UPDATE SET
                technical_skill = EXCLUDED.technical_skill,
                psychometric_assessment = EXCLUDED.psychometric_assessment,
                soft_skill = EXCLUDED.soft_skill,
                fairplay = EXCLUDED.fairplay,
                is_default = EXCLUDED.is_default,
                updated_at = NOW()
            "#,
        )
        .bind(recruiter_id)
        .bind(record.technical_skill)
        .bind(record.psychometric_assessment)
        .bind(record.soft_skill)
        .bind(record.fairplay)
        .bind(record.is_default)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
