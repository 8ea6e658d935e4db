//! Schema definition and bootstrap
//!
//! Table definitions for the platform's PostgreSQL store. The statements are
//! idempotent so `apply_schema` can run at startup and in test setups; a
//! dedicated migration tool can take over without changing the shape.

use sqlx::PgPool;
use tracing::info;

use kontor_core::{KontorError, Result};

pub const SCHEMA_SQL: &str = r#"
-- =========================================================================
-- Lookup tables: positions, departments, taxonomy
-- =========================================================================
CREATE TABLE IF NOT EXISTS staff_positions (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_by_id UUID,
    updated_by_id UUID,
    deleted_by_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_staff_positions_name
    ON staff_positions (name) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS staff_departments (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_by_id UUID,
    updated_by_id UUID,
    deleted_by_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_staff_departments_name
    ON staff_departments (name) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS ads_languages (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_by_id UUID,
    updated_by_id UUID,
    deleted_by_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_ads_languages_name
    ON ads_languages (name) WHERE deleted_at IS NULL;

-- =========================================================================
-- Staff & groups
-- =========================================================================
CREATE TABLE IF NOT EXISTS staff (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    bio TEXT,
    position_id UUID NOT NULL REFERENCES staff_positions (id),
    department_id UUID NOT NULL REFERENCES staff_departments (id),
    is_root BOOLEAN NOT NULL DEFAULT FALSE,
    created_by_id UUID,
    updated_by_id UUID,
    deleted_by_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_staff_email
    ON staff (email) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS groups (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_by_id UUID,
    updated_by_id UUID,
    deleted_by_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_groups_name
    ON groups (name) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS group_memberships (
    id UUID PRIMARY KEY,
    staff_id UUID NOT NULL REFERENCES staff (id),
    group_id UUID NOT NULL REFERENCES groups (id),
    created_by_id UUID,
    updated_by_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (staff_id, group_id)
);

-- =========================================================================
-- Permission catalog (seeded reference data)
-- =========================================================================
CREATE TABLE IF NOT EXISTS permission_resources (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS permission_actions (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS permissions (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    resource_id UUID NOT NULL REFERENCES permission_resources (id),
    action_id UUID NOT NULL REFERENCES permission_actions (id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (resource_id, action_id)
);

-- =========================================================================
-- Grants: one table parameterized by subject kind
-- =========================================================================
CREATE TABLE IF NOT EXISTS grants (
    id UUID PRIMARY KEY,
    subject_kind TEXT NOT NULL CHECK (subject_kind IN ('staff', 'group')),
    subject_id UUID NOT NULL,
    permission_id UUID NOT NULL REFERENCES permissions (id),
    is_allowed_all BOOLEAN NOT NULL DEFAULT FALSE,
    allow_ids UUID[] NOT NULL DEFAULT '{}',
    created_by_id UUID,
    updated_by_id UUID,
    deleted_by_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at TIMESTAMPTZ
);
-- At most one live grant per (subject, permission); the upsert conflicts here
CREATE UNIQUE INDEX IF NOT EXISTS uq_grants_subject_permission
    ON grants (subject_kind, subject_id, permission_id) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_grants_subject
    ON grants (subject_kind, subject_id) WHERE deleted_at IS NULL;
"#;

/// Apply the schema to the connected database.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(|e| KontorError::database_error(format!("failed to apply schema: {}", e)))?;
    info!("database schema applied");
    Ok(())
}
