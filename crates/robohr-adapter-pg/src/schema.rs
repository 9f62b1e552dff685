//! DDL for the RoboHR tables. Every statement is idempotent.

pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id          BIGSERIAL PRIMARY KEY,
        first_name  TEXT NOT NULL,
        last_name   TEXT NOT NULL,
        email       TEXT NOT NULL UNIQUE,
        department  TEXT,
        position    TEXT,
        salary      DOUBLE PRECISION NOT NULL DEFAULT 0,
        hire_date   DATE,
        status      TEXT NOT NULL DEFAULT 'active'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id           BIGSERIAL PRIMARY KEY,
        employee_id  BIGINT NOT NULL REFERENCES employees(id),
        date         DATE NOT NULL,
        clock_in     TIMESTAMP NOT NULL,
        clock_out    TIMESTAMP,
        hours_worked DOUBLE PRECISION
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS attendance_one_open_per_day
        ON attendance (employee_id, date) WHERE clock_out IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leave_requests (
        id          BIGSERIAL PRIMARY KEY,
        employee_id BIGINT NOT NULL REFERENCES employees(id),
        start_date  DATE NOT NULL,
        end_date    DATE NOT NULL,
        leave_type  TEXT NOT NULL DEFAULT 'annual',
        reason      TEXT,
        status      TEXT NOT NULL DEFAULT 'pending',
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (end_date >= start_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payroll (
        id           BIGSERIAL PRIMARY KEY,
        employee_id  BIGINT NOT NULL REFERENCES employees(id),
        month        INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
        year         INTEGER NOT NULL,
        basic_salary DOUBLE PRECISION NOT NULL,
        allowances   DOUBLE PRECISION NOT NULL DEFAULT 0,
        deductions   DOUBLE PRECISION NOT NULL DEFAULT 0,
        net_salary   DOUBLE PRECISION NOT NULL,
        status       TEXT NOT NULL DEFAULT 'generated',
        created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (employee_id, month, year)
    )
    "#,
];
