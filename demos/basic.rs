use measurement_flags::{Client, Document, Element, FlagToggleController};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:5000".to_string());

    // Initialize the client
    let client = Client::builder().with_base_url(&base_url).build()?;

    let controller = FlagToggleController::builder(client)
        .with_reload(|| println!("Reloading page"))
        .build();

    // A page with two flag buttons
    let mut document = Document::new();
    document.push(Element::flag_button("1"));
    document.push(Element::flag_button("2"));

    let bound = controller.bind(&document);
    println!("Bound {} flag buttons", bound);

    // Drive the toggle directly so the outcome can be printed
    for id in ["1", "2"] {
        let outcome = controller.toggle(id).await;
        println!("Measurement {}: {:?}", id, outcome);
    }

    Ok(())
}
