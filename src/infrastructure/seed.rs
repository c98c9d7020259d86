use crate::models::{book, book_copy, borrowing};
use sea_orm::*;

struct DemoCopy {
    tracking_code: Option<&'static str>,
    status: &'static str,
    on_loan: bool,
}

const fn copy(tracking_code: Option<&'static str>, status: &'static str) -> DemoCopy {
    DemoCopy {
        tracking_code,
        status,
        on_loan: false,
    }
}

struct DemoBook {
    title: &'static str,
    author: &'static str,
    book_code: Option<&'static str>,
    total_copies: i32,
    available_copies: i32,
    copies: Vec<DemoCopy>,
}

/// A small inventory that has drifted in every way the reconciliation scan
/// knows about, plus one consistent book. Does nothing if books exist.
pub async fn seed_demo_inventory(db: &DatabaseConnection) -> Result<(), DbErr> {
    if book::Entity::find().count(db).await? > 0 {
        tracing::info!("Inventory already has books, skipping demo seed");
        return Ok(());
    }

    let books = vec![
        // Consistent: one copy on the shelf, one out on an active loan
        DemoBook {
            title: "Dune",
            author: "Frank Herbert",
            book_code: Some("DUN"),
            total_copies: 2,
            available_copies: 1,
            copies: vec![
                copy(Some("DUN-01"), "available"),
                DemoCopy {
                    tracking_code: Some("DUN-02"),
                    status: "borrowed",
                    on_loan: true,
                },
            ],
        },
        // Declares three copies, has two, and has no code
        DemoBook {
            title: "Atlas of Kenya",
            author: "Survey of Kenya",
            book_code: None,
            total_copies: 3,
            available_copies: 3,
            copies: vec![
                copy(Some("X-01"), "available"),
                copy(Some("X-02"), "available"),
            ],
        },
        // Declares copies that were never created
        DemoBook {
            title: "Emma",
            author: "Jane Austen",
            book_code: Some("EMM"),
            total_copies: 4,
            available_copies: 4,
            copies: vec![],
        },
        // A copy still marked borrowed after its loan was returned
        DemoBook {
            title: "The Odyssey",
            author: "Homer",
            book_code: Some("THE"),
            total_copies: 2,
            available_copies: 1,
            copies: vec![
                copy(Some("THE-01"), "available"),
                copy(Some("THE-02"), "borrowed"),
            ],
        },
        // Two copies sharing a tracking code
        DemoBook {
            title: "Beowulf",
            author: "Unknown",
            book_code: Some("BEO"),
            total_copies: 2,
            available_copies: 2,
            copies: vec![
                copy(Some("BEO-01"), "available"),
                copy(Some("BEO-01"), "available"),
            ],
        },
        // Copy label lost in an import
        DemoBook {
            title: "Hamlet",
            author: "William Shakespeare",
            book_code: Some("HAM"),
            total_copies: 1,
            available_copies: 1,
            copies: vec![copy(None, "available")],
        },
    ];

    let now = chrono::Utc::now();
    let due = now + chrono::Duration::days(14);

    for demo in books {
        let inserted = book::ActiveModel {
            title: Set(demo.title.to_owned()),
            author: Set(Some(demo.author.to_owned())),
            book_code: Set(demo.book_code.map(str::to_owned)),
            total_copies: Set(demo.total_copies),
            available_copies: Set(demo.available_copies),
            status: Set("available".to_owned()),
            created_at: Set(now.to_rfc3339()),
            updated_at: Set(now.to_rfc3339()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        for (i, demo_copy) in demo.copies.iter().enumerate() {
            let copy = book_copy::ActiveModel {
                book_id: Set(inserted.id),
                copy_number: Set(i as i32 + 1),
                book_code: Set(demo.book_code.map(str::to_owned)),
                tracking_code: Set(demo_copy.tracking_code.map(str::to_owned)),
                status: Set(demo_copy.status.to_owned()),
                condition: Set("good".to_owned()),
                created_at: Set(now.to_rfc3339()),
                updated_at: Set(now.to_rfc3339()),
                ..Default::default()
            }
            .insert(db)
            .await?;

            if demo_copy.on_loan {
                borrowing::ActiveModel {
                    student_id: Set(Some(1)),
                    book_id: Set(Some(inserted.id)),
                    book_copy_id: Set(Some(copy.id)),
                    borrowed_date: Set(now.to_rfc3339()),
                    due_date: Set(due.to_rfc3339()),
                    status: Set("active".to_owned()),
                    created_at: Set(now.to_rfc3339()),
                    updated_at: Set(now.to_rfc3339()),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
        }
    }

    tracing::info!("🌱 Demo inventory seeded");
    Ok(())
}
