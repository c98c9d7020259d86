use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Aggregate book records with denormalized counters
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT,
            isbn TEXT,
            book_code TEXT,
            total_copies INTEGER NOT NULL DEFAULT 0,
            available_copies INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'available',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // One row per physical copy.
    // tracking_code is NOT unique here: legacy imports contain duplicates
    // that the reconciliation scan has to be able to see.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS book_copies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            copy_number INTEGER NOT NULL,
            book_code TEXT,
            tracking_code TEXT,
            status TEXT NOT NULL DEFAULT 'available',
            condition TEXT NOT NULL DEFAULT 'good',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books (id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Loan ledger
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS borrowings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER,
            book_id INTEGER,
            book_copy_id INTEGER,
            borrowed_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            returned_date TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_copy_id) REFERENCES book_copies (id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Indexes for the lookups the reconciliation engine performs
    for index in [
        "CREATE INDEX IF NOT EXISTS idx_books_code ON books(book_code)",
        "CREATE INDEX IF NOT EXISTS idx_book_copies_book ON book_copies(book_id)",
        "CREATE INDEX IF NOT EXISTS idx_book_copies_tracking ON book_copies(tracking_code)",
        "CREATE INDEX IF NOT EXISTS idx_borrowings_status ON borrowings(status)",
        "CREATE INDEX IF NOT EXISTS idx_borrowings_book_copy ON borrowings(book_copy_id)",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            index.to_owned(),
        ))
        .await?;
    }

    Ok(())
}
