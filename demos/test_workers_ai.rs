//! Example: Test Workers AI Connection
//!
//! Sends one small generated photo through the img2img model to verify that
//! the Workers AI credentials and model id are configured correctly.
//!
//! Usage:
//!   cargo run --example test_workers_ai
//!
//! Prerequisites:
//!   - .env file with CF_ACCOUNT_ID and CF_API_TOKEN (TRANSFORM_MODEL optional)

use std::env;
use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use photoshoot::models::image::SourceImage;
use photoshoot::services::catalog;
use photoshoot::services::transform::ImageTransform;
use photoshoot::services::workers_ai::{WorkersAiClient, DEFAULT_MODEL};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    println!("🤖 Workers AI Connection Test\n");

    let account_id = env::var("CF_ACCOUNT_ID")?;
    let api_token = env::var("CF_API_TOKEN")?;
    let model = env::var("TRANSFORM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

    println!("📋 Configuration:");
    println!("   Account ID: {}***", &account_id[..8.min(account_id.len())]);
    println!("   Model: {}", model);
    println!();

    let client = WorkersAiClient::new(&account_id, &api_token, &model, Duration::from_secs(120))?;

    // A flat 256x256 gradient is enough to exercise the endpoint.
    let pixels = RgbImage::from_fn(256, 256, |x, y| Rgb([x as u8, y as u8, 128]));
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(pixels).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    let source = SourceImage::from_bytes(png)?;

    let style = catalog::find("Soft Smile").ok_or("style missing from catalog")?;
    println!("🔄 Sending transform request ({})...", style.name);

    match client.transform(&source, style.directive).await {
        Ok(image) => {
            println!("✅ API call successful");
            println!("   Content type: {}", image.content_type());
            println!("   Size: {} bytes", image.len());
        }
        Err(e) => {
            println!("❌ API call failed: {}", e);
            println!("\n🔍 Troubleshooting:");
            println!("   1. Verify CF_ACCOUNT_ID is correct");
            println!("   2. Verify CF_API_TOKEN has Workers AI → Read permission");
            println!("   3. Check the model id supports image-to-image");
            return Err(e.into());
        }
    }

    println!("\n🎉 Workers AI is responding correctly!");
    Ok(())
}
