use clap::Subcommand;
use uuid::Uuid;

use crate::cart::{CartBackend, HttpCartBackend, LocalCart, SyncState};
use crate::error::MarketResult;

#[derive(Subcommand)]
pub enum CartCommands {
    /// Show the cart and its totals
    List,
    /// Add a listing to the cart
    Add {
        product_id: Uuid,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line (0 removes it)
    Set {
        product_id: Uuid,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove a listing from the cart
    Remove { product_id: Uuid },
    /// Remove every line
    Clear,
}

pub async fn handle_cart_command(server: &str, token: &str, cmd: CartCommands) -> MarketResult<()> {
    let mut cart = LocalCart::new(HttpCartBackend::new(server, token));
    cart.refresh().await?;

    let state = match cmd {
        CartCommands::List => SyncState::Synced,
        CartCommands::Add { product_id, quantity } => {
            let product = cart.backend().listing(product_id).await?;
            cart.add(product, quantity).await?
        }
        CartCommands::Set { product_id, quantity } => cart.update_quantity(product_id, quantity).await,
        CartCommands::Remove { product_id } => cart.remove(product_id).await,
        CartCommands::Clear => cart.clear().await,
    };

    print_cart(&cart);
    if state == SyncState::Diverged {
        println!("Warning: the server did not confirm the change; showing local state.");
    }
    Ok(())
}

fn print_cart<B: CartBackend>(cart: &LocalCart<B>) {
    if cart.items().is_empty() {
        println!("Cart is empty.");
        return;
    }
    for item in cart.items() {
        println!(
            "{:>3} x {:<40} ${:>10}  ({})",
            item.quantity,
            item.product.title,
            item.line_total().to_string(),
            item.product.id
        );
    }
    println!("Items: {}  Total: ${}", cart.total_items(), cart.total_price());
}
