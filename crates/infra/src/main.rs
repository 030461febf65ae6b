//! `stockledger <journal.json>`
//!
//! Replays a journal of catalog entries and movements through the ledger and
//! prints per-warehouse stock followed by each product's audit trail as CSV.
//! Rejected movements are logged and skipped.

use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use stockledger_catalog::{Catalog, InMemoryCatalog, NewProduct, Product, Warehouse};
use stockledger_core::{CompanyId, SourceId};
use stockledger_infra::export::audit_trail_csv;
use stockledger_infra::{InMemoryMovementLog, LedgerConfig, MovementLog, StockLedger};
use stockledger_movements::{NewInward, OutwardDraft};
use stockledger_sources::SourceType;

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(default)]
    products: Vec<ProductEntry>,
    #[serde(default)]
    warehouses: Vec<WarehouseEntry>,
    #[serde(default)]
    sources: Vec<SourceEntry>,
    #[serde(default)]
    movements: Vec<MovementEntry>,
}

#[derive(Debug, Deserialize)]
struct ProductEntry {
    sku: String,
    name: String,
    ean: Option<String>,
    #[serde(default)]
    cost_price: i64,
}

#[derive(Debug, Deserialize)]
struct WarehouseEntry {
    name: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    name: String,
    #[serde(rename = "type")]
    source_type: SourceType,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum MovementEntry {
    Inward {
        sku: String,
        warehouse: String,
        quantity: i64,
        source: Option<String>,
        batch_no: Option<String>,
        mfg_date: Option<NaiveDate>,
        exp_date: Option<NaiveDate>,
        cost_price: Option<i64>,
        document_no: Option<String>,
        at: Option<DateTime<Utc>>,
    },
    Outward {
        sku: String,
        warehouse: String,
        quantity: i64,
        destination: String,
        batch_no: Option<String>,
        shipment_ref: Option<String>,
        at: Option<DateTime<Utc>>,
    },
}

type Ledger = StockLedger<InMemoryMovementLog<Arc<InMemoryCatalog>>, Arc<InMemoryCatalog>>;

fn main() -> anyhow::Result<()> {
    let config = LedgerConfig::from_env();
    stockledger_observability::init_with_filter(&config.log_filter);

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => bail!("usage: stockledger <journal.json>"),
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let journal: Journal =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let catalog = Arc::new(InMemoryCatalog::new());
    for p in &journal.products {
        let mut product = NewProduct::new(&p.sku, &p.name).with_cost_price(p.cost_price);
        if let Some(ean) = &p.ean {
            product = product.with_ean(ean);
        }
        catalog
            .add_product(product)
            .with_context(|| format!("registering product {}", p.sku))?;
    }
    for w in &journal.warehouses {
        catalog
            .add_warehouse(&w.name, &w.code)
            .with_context(|| format!("registering warehouse {}", w.code))?;
    }

    let ledger: Ledger = StockLedger::in_memory(catalog.clone(), config);
    let company = CompanyId::new();
    ledger.seed_company(company)?;
    for s in &journal.sources {
        ledger
            .create_source(company, &s.name, s.source_type)
            .with_context(|| format!("creating source {}", s.name))?;
    }

    let mut rejected = 0usize;
    for (idx, entry) in journal.movements.into_iter().enumerate() {
        if let Err(e) = replay(&ledger, &catalog, company, entry) {
            warn!(entry = idx + 1, error = %e, "journal entry rejected");
            rejected += 1;
        }
    }
    info!(records = ledger.log().len()?, rejected, "journal replayed");

    println!("sku,warehouse,stock");
    for product in catalog.products() {
        for (warehouse_id, stock) in ledger.stock_by_warehouse(product.id, company)? {
            let code = catalog
                .warehouse(warehouse_id)
                .map(|w| w.code)
                .unwrap_or_default();
            println!("{},{},{}", product.sku, code, stock);
        }
    }

    for product in catalog.products() {
        let trail = ledger.audit_trail(product.id, None, Some(company))?;
        if trail.is_empty() {
            continue;
        }
        println!();
        println!("# {} ({})", product.sku, product.name);
        print!("{}", audit_trail_csv(&trail)?);
    }

    Ok(())
}

fn replay(
    ledger: &Ledger,
    catalog: &InMemoryCatalog,
    company: CompanyId,
    entry: MovementEntry,
) -> anyhow::Result<()> {
    match entry {
        MovementEntry::Inward {
            sku,
            warehouse,
            quantity,
            source,
            batch_no,
            mfg_date,
            exp_date,
            cost_price,
            document_no,
            at,
        } => {
            let product = find_product(catalog, &sku)?;
            let warehouse = find_warehouse(catalog, &warehouse)?;
            let mut input = NewInward::new(
                company,
                product.id,
                warehouse.id,
                quantity,
                at.unwrap_or_else(Utc::now),
            );
            if let Some(batch_no) = batch_no {
                input = input.with_batch(batch_no, mfg_date, exp_date);
            }
            if let Some(name) = source {
                input = input.with_source(find_source(ledger, company, &name, SourceType::Inward)?);
            }
            if let Some(cost_price) = cost_price {
                input = input.with_cost_price(cost_price);
            }
            if let Some(document_no) = document_no {
                input = input.with_document_no(document_no);
            }
            ledger.add_inward(input)?;
        }
        MovementEntry::Outward {
            sku,
            warehouse,
            quantity,
            destination,
            batch_no,
            shipment_ref,
            at,
        } => {
            let product = find_product(catalog, &sku)?;
            let warehouse = find_warehouse(catalog, &warehouse)?;
            let destination = find_source(ledger, company, &destination, SourceType::Outward)?;
            let mut draft = OutwardDraft::new(
                company,
                product.id,
                warehouse.id,
                quantity,
                destination,
                at.unwrap_or_else(Utc::now),
            );
            if let Some(batch_no) = batch_no {
                let batch = ledger
                    .available_batches(company, product.id, warehouse.id)?
                    .into_iter()
                    .find(|b| b.record.batch_no.as_deref() == Some(batch_no.trim()))
                    .with_context(|| format!("no available batch {batch_no} for {sku}"))?;
                draft = draft.with_batch(batch.record.id);
            }
            if let Some(shipment_ref) = shipment_ref {
                draft = draft.with_shipment_ref(shipment_ref);
            }
            ledger.add_outward(draft)?;
        }
    }
    Ok(())
}

fn find_product(catalog: &InMemoryCatalog, sku: &str) -> anyhow::Result<Product> {
    catalog
        .product_by_sku(sku)
        .with_context(|| format!("unknown sku {sku}"))
}

fn find_warehouse(catalog: &InMemoryCatalog, code: &str) -> anyhow::Result<Warehouse> {
    catalog
        .warehouses()
        .into_iter()
        .find(|w| w.code.eq_ignore_ascii_case(code.trim()))
        .with_context(|| format!("unknown warehouse {code}"))
}

fn find_source(
    ledger: &Ledger,
    company: CompanyId,
    name: &str,
    direction: SourceType,
) -> anyhow::Result<SourceId> {
    ledger
        .sources(company, direction)?
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .map(|s| s.id)
        .with_context(|| format!("unknown {direction} source {name}"))
}
