use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use entity_mapper::{
    count_rows, load_users_csv, open_database, setup_database, Entity, EntityId, EntityRef,
    IdentityMap, SaveOutcome, User, VERSION,
};

const DEFAULT_DB: &str = "entities.db";

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let db_path = database_path();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let csv_path = args.get(2).ok_or_else(|| anyhow!("usage: entity-mapper import <users.csv>"))?;
            run_import(Path::new(csv_path), &db_path)
        }
        Some("show") => run_show(parse_id(args.get(2))?, &db_path),
        Some("delete") => run_delete(parse_id(args.get(2))?, &db_path),
        Some("list") | None => run_list(&db_path),
        Some(other) => Err(anyhow!(
            "unknown command {:?} (expected import, list, show or delete)",
            other
        )),
    }
}

/// Log level from ENTITY_MAPPER_LOG (error..trace), INFO by default.
fn init_tracing() {
    let level = env::var("ENTITY_MAPPER_LOG")
        .ok()
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn database_path() -> PathBuf {
    env::var("ENTITY_MAPPER_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB))
}

fn parse_id(arg: Option<&String>) -> Result<EntityId> {
    let raw = arg.ok_or_else(|| anyhow!("missing user id"))?;
    raw.parse::<EntityId>()
        .with_context(|| format!("{:?} is not a user id", raw))
}

fn run_import(csv_path: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  Entity Mapper v{} - CSV → SQLite", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let users = load_users_csv(csv_path)?;
    println!("✓ Loaded {} users from CSV", users.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let conn = open_database(db_path)?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Save through the mapper
    println!("\n💾 Saving users...");
    let mapper = User::mapper(&conn, IdentityMap::shared())?;
    let mut inserted = 0;
    for user in users {
        let user = EntityRef::new(user);
        match mapper.save(&user)? {
            SaveOutcome::Inserted(_) => inserted += 1,
            SaveOutcome::Updated | SaveOutcome::Unchanged => {}
        }
    }
    println!("✓ Inserted: {} users", inserted);

    // 4. Verify count
    println!("\n🔍 Verifying database...");
    let count = count_rows(&conn, mapper.table())?;
    println!("✓ Database contains {} users", count);

    Ok(())
}

fn run_list(db_path: &Path) -> Result<()> {
    let conn = open_database(db_path)?;
    setup_database(&conn)?;

    let mapper = User::mapper(&conn, IdentityMap::shared())?;
    let users = mapper.find_all()?;

    println!("📊 {} users\n", users.len());
    for user in &users {
        print_user(user);
    }

    Ok(())
}

fn run_show(id: EntityId, db_path: &Path) -> Result<()> {
    let conn = open_database(db_path)?;
    setup_database(&conn)?;
    let mapper = User::mapper(&conn, IdentityMap::shared())?;

    match mapper.find(id)? {
        Some(user) => print_user(&user),
        None => println!("❌ No user #{}", id),
    }

    Ok(())
}

fn run_delete(id: EntityId, db_path: &Path) -> Result<()> {
    let conn = open_database(db_path)?;
    setup_database(&conn)?;
    let mapper = User::mapper(&conn, IdentityMap::shared())?;

    let Some(user) = mapper.find(id)? else {
        println!("❌ No user #{}", id);
        return Ok(());
    };

    mapper.delete(&user)?;
    println!("✅ Deleted user #{}", id);

    Ok(())
}

fn print_user(user: &EntityRef<User>) {
    let user = user.read();
    println!(
        "#{:<5} {:<30} {}",
        user_id(&user),
        user.display_name(),
        user.email().unwrap_or("-")
    );
}

fn user_id(user: &User) -> String {
    user.id().map_or_else(|| "-".to_string(), |id| id.to_string())
}
