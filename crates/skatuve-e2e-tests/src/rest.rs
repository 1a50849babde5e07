use anyhow::Result;
use reqwest::Url;
use serde_json::json;
use skatuve_dal::gallery::Gallery;
use tracing::info;

pub async fn create_gallery(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    event_date: &str,
) -> Result<Gallery> {
    let payload = json!({"name": name, "description": format!("{name} photos"), "eventDate": event_date});
    let api_url = base_url.join("api/galleries")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Create Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);

    let gallery: Gallery = response.json().await?;
    Ok(gallery)
}

pub fn gallery_url(base_url: &Url, id: &str) -> Result<Url> {
    Ok(base_url.join(&format!("api/galleries/{id}"))?)
}
