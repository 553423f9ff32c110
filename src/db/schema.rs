/// SQL schema for the village records database

pub const SCHEMA_VERSION: i32 = 1;

pub const CREATE_TABLES: &str = r#"
-- Village identity (singleton, id=1)
CREATE TABLE IF NOT EXISTS village_info (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    name TEXT NOT NULL DEFAULT '',
    district TEXT NOT NULL DEFAULT '',
    regency TEXT NOT NULL DEFAULT '',
    province TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    postal_code TEXT NOT NULL DEFAULT '',
    leader_name TEXT NOT NULL DEFAULT '',
    leader_title TEXT NOT NULL DEFAULT 'Kepala Desa',
    phone TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    logo_path TEXT,
    signature_path TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
);

-- Residents
CREATE TABLE IF NOT EXISTS residents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kk_number TEXT NOT NULL,
    nik TEXT NOT NULL,
    name TEXT NOT NULL,
    birth_place TEXT NOT NULL DEFAULT '',
    birth_date TEXT,
    gender TEXT NOT NULL DEFAULT 'L',
    address TEXT NOT NULL DEFAULT '',
    rt TEXT NOT NULL DEFAULT '',
    rw TEXT NOT NULL DEFAULT '',
    family_status TEXT NOT NULL DEFAULT '',
    religion TEXT NOT NULL DEFAULT '',
    occupation TEXT NOT NULL DEFAULT '',
    marital_status TEXT NOT NULL DEFAULT '',
    education TEXT NOT NULL DEFAULT '',
    blood_type TEXT,
    disability TEXT,
    father_name TEXT NOT NULL DEFAULT '',
    mother_name TEXT NOT NULL DEFAULT '',
    photo_path TEXT,
    has_ektp INTEGER NOT NULL DEFAULT 0,
    has_birth_certificate INTEGER NOT NULL DEFAULT 0,
    birth_certificate_number TEXT,
    has_marriage_certificate INTEGER NOT NULL DEFAULT 0,
    marriage_certificate_number TEXT,
    has_divorce_certificate INTEGER NOT NULL DEFAULT 0,
    divorce_certificate_number TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- NIK is indexed for lookup but deliberately not UNIQUE
CREATE INDEX IF NOT EXISTS idx_residents_nik ON residents(nik);
CREATE INDEX IF NOT EXISTS idx_residents_name ON residents(name);
CREATE INDEX IF NOT EXISTS idx_residents_kk ON residents(kk_number);

-- Letters
CREATE TABLE IF NOT EXISTS letters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    letter_number TEXT NOT NULL,
    letter_type TEXT NOT NULL,
    resident_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    purpose TEXT,
    issued_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (resident_id) REFERENCES residents(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_letters_resident ON letters(resident_id);
CREATE INDEX IF NOT EXISTS idx_letters_type_date ON letters(letter_type, issued_date);
CREATE UNIQUE INDEX IF NOT EXISTS idx_letters_number
    ON letters(letter_type, substr(issued_date, 1, 4), letter_number);

-- Letter templates
CREATE TABLE IF NOT EXISTS letter_templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    letter_type TEXT NOT NULL,
    name TEXT NOT NULL,
    content TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_templates_type ON letter_templates(letter_type);
-- At most one default per letter type
CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_single_default
    ON letter_templates(letter_type) WHERE is_default = 1;

-- Custom resident fields
CREATE TABLE IF NOT EXISTS custom_fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    field_type TEXT NOT NULL DEFAULT 'text',
    options TEXT,
    required INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resident_custom_fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resident_id INTEGER NOT NULL,
    custom_field_id INTEGER NOT NULL,
    value TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (resident_id) REFERENCES residents(id) ON DELETE CASCADE,
    FOREIGN KEY (custom_field_id) REFERENCES custom_fields(id) ON DELETE CASCADE,
    UNIQUE (resident_id, custom_field_id)
);

CREATE INDEX IF NOT EXISTS idx_custom_values_resident ON resident_custom_fields(resident_id);

-- Migration history
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
