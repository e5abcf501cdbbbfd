// storefront-client/examples/cart_session.rs
// Mounts a storefront from the environment and walks one cart through add / update / clear

use storefront_client::{AddToCart, Decimal, MenuItem, StorefrontConfig, StorefrontContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = std::env::var("STOREFRONT_LOG_DIR").ok();
    storefront_client::logger::init_logger(
        "info",
        false,
        log_dir.as_deref().map(std::path::Path::new),
    )?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        println!("Usage: {} <product_id> <price> [quantity]", args[0]);
        println!("  Example: {} burger 9.50 2", args[0]);
        println!("  Requires STOREFRONT_API_URL and STOREFRONT_ORGANIZATION");
        return Ok(());
    }

    let product_id = &args[1];
    let price: Decimal = args[2].parse()?;
    let quantity: u32 = args.get(3).map(|q| q.parse::<u32>()).transpose()?.unwrap_or(1);

    let config = StorefrontConfig::from_env()?;
    let ctx = StorefrontContext::mount(config).await?;
    let cart = ctx.cart();

    let snapshot = cart.snapshot();
    tracing::info!(
        location_id = ?snapshot.location_id,
        cart_id = ?snapshot.cart_id,
        using_api = snapshot.using_api,
        "Storefront mounted"
    );
    if let Some(message) = &snapshot.session_error {
        tracing::warn!("Ordering unavailable: {}", message);
    }

    let item = MenuItem::new(product_id.as_str(), product_id.as_str(), price);
    let outcome = cart.add_to_cart(AddToCart::new(item, quantity)).await;
    tracing::info!(?outcome, "Added {} x {}", quantity, product_id);

    for item in cart.items() {
        println!(
            "{:<24} {:>4} x {:>8} = {:>8}",
            item.name, item.quantity, item.unit_price, item.line_total
        );
    }

    if let Some(line) = cart.items().first() {
        let outcome = cart
            .update_quantity(&line.line_id, i64::from(line.quantity) + 1)
            .await;
        tracing::info!(?outcome, line_id = %line.line_id, "Bumped quantity");
    }

    let totals = cart.totals();
    println!("items:    {}", totals.quantity);
    println!("subtotal: {}", totals.subtotal);
    println!("tax:      {}", totals.tax);
    println!("total:    {}", totals.total);

    if let Some(url) = cart.snapshot().checkout_url {
        println!("checkout: {}", url);
    }
    if let Some(error) = cart.error() {
        tracing::warn!("Cart error: {}", error);
    }

    if std::env::var("STOREFRONT_DEMO_CLEAR").is_ok() {
        cart.clear_cart().await;
        tracing::info!("Cart cleared");
    }

    ctx.teardown();
    Ok(())
}
