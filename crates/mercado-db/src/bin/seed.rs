//! # Seed Data Generator
//!
//! Populates the database with test clients, products, and orders for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p mercado-db --bin seed
//!
//! # Specify database path
//! cargo run -p mercado-db --bin seed -- --db ./data/mercado.db
//!
//! # Generate a custom number of orders
//! cargo run -p mercado-db --bin seed -- --orders 50
//! ```
//!
//! ## Generated Data
//! - A fixed roster of clients with unique emails and CPFs
//! - A product catalog across grocery sections with prices in cents
//! - Orders with 1-4 line items each, totals computed by the repository

use std::env;

use mercado_core::{ItemRequest, NewClient, NewOrder, NewProduct};
use mercado_db::{Database, DbConfig};

const CLIENTS: &[(&str, &str, &str)] = &[
    ("Ana Souza", "ana.souza@example.com", "11144477735"),
    ("Bruno Lima", "bruno.lima@example.com", "22255588846"),
    ("Carla Mendes", "carla.mendes@example.com", "33366699957"),
    ("Diego Ferreira", "diego.ferreira@example.com", "44477711168"),
    ("Elisa Rocha", "elisa.rocha@example.com", "55588822279"),
    ("Fabio Cardoso", "fabio.cardoso@example.com", "66699933380"),
    ("Gabriela Nunes", "gabriela.nunes@example.com", "77711144491"),
    ("Heitor Alves", "heitor.alves@example.com", "88822255502"),
];

/// (description, section, base price in cents)
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("Arroz Branco 5kg", "Mercearia", 2490),
    ("Feijao Carioca 1kg", "Mercearia", 899),
    ("Macarrao Espaguete 500g", "Mercearia", 549),
    ("Oleo de Soja 900ml", "Mercearia", 749),
    ("Acucar Refinado 1kg", "Mercearia", 479),
    ("Cafe Torrado 500g", "Mercearia", 1890),
    ("Leite Integral 1L", "Laticinios", 629),
    ("Queijo Mussarela 400g", "Laticinios", 2150),
    ("Iogurte Natural 170g", "Laticinios", 349),
    ("Manteiga 200g", "Laticinios", 1290),
    ("Refrigerante Cola 2L", "Bebidas", 999),
    ("Suco de Laranja 1L", "Bebidas", 879),
    ("Agua Mineral 1.5L", "Bebidas", 299),
    ("Sabao em Po 1kg", "Limpeza", 1590),
    ("Detergente 500ml", "Limpeza", 289),
    ("Papel Higienico 12un", "Limpeza", 1990),
];

const STATUSES: &[&str] = &["pending", "paid", "shipped", "delivered"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut order_count: usize = 20;
    let mut db_path = String::from("./mercado_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    order_count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mercado Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of orders to generate (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./mercado_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mercado Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Orders:   {}", order_count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing clients
    let existing = db.clients().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} clients", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Clients
    println!();
    println!("Registering clients...");
    let mut client_ids = Vec::with_capacity(CLIENTS.len());
    for (name, email, cpf) in CLIENTS {
        let client = db
            .clients()
            .register(NewClient {
                name: (*name).to_string(),
                email: (*email).to_string(),
                cpf: (*cpf).to_string(),
            })
            .await?;
        client_ids.push(client.id);
    }
    println!("  Registered {} clients", client_ids.len());

    // Products
    println!("Creating products...");
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for (idx, (description, section, price_cents)) in PRODUCTS.iter().enumerate() {
        let product = db
            .products()
            .create(NewProduct {
                description: (*description).to_string(),
                sale_value_cents: *price_cents,
                barcode: format!("789{:010}", idx),
                section: (*section).to_string(),
                initial_stock: ((idx * 13) % 60) as i64,
                expiry_date: None,
            })
            .await?;
        product_ids.push(product.id);
    }
    println!("  Created {} products", product_ids.len());

    // Orders with 1-4 items each
    println!("Creating orders...");
    let mut created = 0;
    for n in 0..order_count {
        let client_id = client_ids[n % client_ids.len()].clone();
        let status = STATUSES[n % STATUSES.len()].to_string();

        let item_count = 1 + (n * 7) % 4;
        let mut items = Vec::with_capacity(item_count);
        for k in 0..item_count {
            let product_id = product_ids[(n * 5 + k * 3) % product_ids.len()].clone();
            items.push(ItemRequest {
                product_id,
                quantity: (1 + (n + k * 2) % 6) as i64,
            });
        }

        let order = db
            .orders()
            .create(NewOrder {
                client_id,
                status,
                items,
            })
            .await?;
        created += 1;

        if created % 10 == 0 {
            println!("  Created {} orders (last total: {})", created, order.total_price());
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Seeded {} orders in {:?}", created, elapsed);

    // Quick sanity read-back
    let orders = db.orders().list(0, 5).await?;
    println!();
    println!("Sample orders:");
    for order in orders {
        println!(
            "  {} [{}] {} items, total {}",
            order.id,
            order.status,
            order.items.len(),
            order.total_price()
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
