use sqlxdbal::{params, Db, DbOptions, Dsn, FetchStyle, Params};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // DATABASE_DSN 形如 `sqlite:/tmp/demo.db`，默认使用内存数据库
    let dsn: Dsn = std::env::var("DATABASE_DSN")
        .unwrap_or_else(|_| "sqlite::memory:".to_string())
        .parse()?;

    println!("Connecting to {} ...", dsn);
    let mut db = Db::connect(&dsn, "", "", DbOptions::new().fetch_style(FetchStyle::Assoc)).await?;
    println!("Connected successfully!\n");

    db.execute(
        "create table if not exists articles (
            id integer primary key,
            title varchar(255),
            content text
        )",
        &Params::new(),
    )
    .await?;
    db.truncate("articles", false).await?;

    // ========== 1. INSERT (插入) ==========
    println!("=== 1. INSERT (插入新记录) ===");
    for i in 1..=3 {
        db.insert(
            "articles",
            &params! {
                "title" => format!("Article {}", i),
                "content" => format!("Content of article {}", i),
            },
        )
        .await?;
        println!("插入成功，ID: {:?}", db.last_insert_id());
    }
    println!();

    // ========== 2. FETCH_ALL (查询所有记录) ==========
    println!("=== 2. FETCH_ALL (查询所有记录) ===");
    for row in db.fetch_all("articles", "", &Params::new(), &[]).await? {
        println!("  {:?}", row);
    }
    println!();

    // ========== 3. FETCH (带条件查询单条记录) ==========
    println!("=== 3. FETCH (带条件查询单条记录) ===");
    let row = db
        .fetch("articles", "WHERE id > :id ORDER BY id DESC", &params! { ":id" => 1 }, &["id", "title"])
        .await?;
    println!("fetch 结果: {:?}\n", row);

    // ========== 4. UPDATE (更新) ==========
    println!("=== 4. UPDATE (更新) ===");
    let affected = db
        .update(
            "articles",
            &params! { "title" => "Article 2 - Updated" },
            "WHERE id = :id",
            &params! { "id" => 2 },
        )
        .await?;
    println!("更新成功，影响 {} 行\n", affected);

    // 数据和条件使用同名参数会被拒绝
    let collision = db
        .update(
            "articles",
            &params! { "id" => 9 },
            "WHERE id = :id",
            &params! { "id" => 2 },
        )
        .await;
    println!("参数名冲突: {:?}\n", collision.err());

    // ========== 5. DELETE (删除) ==========
    println!("=== 5. DELETE (删除) ===");
    let affected = db.delete("articles", "WHERE id = :id", &params! { "id" => 2 }).await?;
    println!("删除成功，影响 {} 行", affected);
    let rows = db.fetch_all_as(FetchStyle::Num, "articles", "", &Params::new(), &[]).await?;
    println!("剩余 {} 条记录: {:?}\n", rows.len(), rows);

    // ========== 6. TRUNCATE (清空表) ==========
    println!("=== 6. TRUNCATE (清空表) ===");
    db.truncate("articles", true).await?;
    let rows = db.fetch_all("articles", "", &Params::new(), &[]).await?;
    println!("清空后剩余 {} 条记录\n", rows.len());

    db.close().await?;
    println!("Connection closed.");
    Ok(())
}
