//! Entity store database schema.

/// SQL to create the entities table.
pub const CREATE_ENTITIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS entities (
    entity_name VARCHAR(255) NOT NULL,
    id          UUID NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NULL,
    data        JSONB NOT NULL,
    PRIMARY KEY (entity_name, id)
);

CREATE INDEX IF NOT EXISTS idx_entities_name_created_at
    ON entities (entity_name, created_at, id);
";
