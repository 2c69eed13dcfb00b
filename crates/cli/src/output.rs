//! Terminal rendering.

#![allow(clippy::print_stdout)]

use rust_decimal::Decimal;
use shopline_core::{Category, EnrichedCartLine, Identity, Product};

pub fn identity(identity: &Identity) {
    match &identity.email {
        Some(email) => println!("{} <{email}> ({})", identity.name, identity.role),
        None => println!("{} ({})", identity.name, identity.role),
    }
}

pub fn anonymous() {
    println!("Not logged in");
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products");
        return;
    }
    for product in products {
        println!(
            "{:<26} {:>10}  {:<14} {}",
            product.id,
            product.price.to_string(),
            product.category,
            product.title
        );
    }
}

pub fn product(product: &Product) {
    println!("{}", product.title);
    println!("  id:       {}", product.id);
    if let Some(code) = &product.product_code {
        println!("  code:     {code}");
    }
    println!("  price:    {}", product.price);
    println!("  category: {}", product.category);
    if let Some(url) = product.image_url() {
        println!("  image:    {url}");
    }
    println!();
    println!("{}", product.description);
    if let Some(content) = product.content.as_deref().filter(|c| !c.is_empty()) {
        println!();
        println!("{content}");
    }
}

pub fn categories(categories: &[Category]) {
    for category in categories {
        println!("{:<26} {}", category.id, category.name);
    }
}

pub fn cart(lines: &[EnrichedCartLine], item_count: u64, total: Decimal) {
    if lines.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in lines {
        println!(
            "{:>4} x {:<30} {:>10} {:>10.2}",
            line.quantity.get(),
            line.product.title,
            line.product.price.to_string(),
            line.line_total()
        );
    }
    println!("{item_count} items, total {total:.2}");
}

pub fn message(text: &str) {
    println!("{text}");
}
