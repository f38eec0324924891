//! Flattening of upstream shop entries into storefront items

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storefront view of one shop offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub regular_price: i64,
    pub item_type: String,
    pub rarity: String,
    pub series: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShopEntry {
    offer_id: String,
    #[serde(default)]
    dev_name: String,
    final_price: i64,
    #[serde(default)]
    regular_price: Option<i64>,
    #[serde(default)]
    bundle: Option<Bundle>,
    #[serde(default)]
    br_items: Option<Vec<BrItem>>,
    #[serde(default)]
    new_display_asset: Option<DisplayAsset>,
}

#[derive(Debug, Deserialize)]
struct Bundle {
    name: String,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrItem {
    name: String,
    #[serde(rename = "type", default)]
    item_type: Option<Labelled>,
    #[serde(default)]
    rarity: Option<Labelled>,
    #[serde(default)]
    series: Option<Series>,
    #[serde(default)]
    images: Option<BrImages>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Labelled {
    value: String,
    #[serde(default)]
    display_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Series {
    value: String,
    #[serde(default)]
    backend_value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrImages {
    #[serde(default)]
    featured: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    small_icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayAsset {
    #[serde(default)]
    render_images: Option<Vec<RenderImage>>,
    #[serde(default)]
    material_instances: Option<Vec<MaterialInstance>>,
}

#[derive(Debug, Deserialize)]
struct RenderImage {
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MaterialInstance {
    #[serde(default)]
    images: Option<BTreeMap<String, Value>>,
}

/// Flatten the raw shop document. Entries that do not parse are skipped.
pub fn normalize(document: &Value) -> Vec<CatalogItem> {
    let entries = match document.pointer("/data/entries").and_then(Value::as_array) {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|raw| match serde_json::from_value::<ShopEntry>(raw.clone()) {
            Ok(entry) => Some(entry.into_item()),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable shop entry");
                None
            }
        })
        .collect()
}

fn remote(url: Option<&str>) -> Option<String> {
    url.filter(|u| u.starts_with("http")).map(str::to_string)
}

impl ShopEntry {
    fn first_item(&self) -> Option<&BrItem> {
        self.br_items.as_ref().and_then(|items| items.first())
    }

    fn into_item(self) -> CatalogItem {
        CatalogItem {
            name: self.name(),
            item_type: self.item_type(),
            rarity: self.rarity(),
            series: self.first_item().and_then(|i| i.series.as_ref()).map(|s| s.value.clone()),
            image: self.image(),
            regular_price: self.regular_price.unwrap_or(self.final_price),
            price: self.final_price,
            id: self.offer_id,
        }
    }

    fn name(&self) -> String {
        if let Some(item) = self.first_item() {
            return item.name.clone();
        }
        if let Some(bundle) = &self.bundle {
            return bundle.name.clone();
        }
        let name = self.dev_name.split(" for ").next().unwrap_or_default();
        name.replace("[VIRTUAL]1 x ", "").replace("[VIRTUAL]", "")
    }

    fn item_type(&self) -> String {
        match (self.first_item(), &self.bundle) {
            (Some(item), _) => item
                .item_type
                .as_ref()
                .map(|t| t.display_value.clone().unwrap_or_else(|| t.value.clone()))
                .unwrap_or_else(|| "Item".to_string()),
            (None, Some(_)) => "Bundle".to_string(),
            (None, None) => "Item".to_string(),
        }
    }

    /// Series names win over plain rarity ("MarvelSeries" -> "marvel")
    fn rarity(&self) -> String {
        let Some(item) = self.first_item() else {
            return "common".to_string();
        };

        if let Some(series) = &item.series {
            return series.backend_value.replace("Series", "").trim().to_lowercase();
        }

        item.rarity
            .as_ref()
            .map(|r| r.value.to_lowercase())
            .unwrap_or_else(|| "common".to_string())
    }

    fn image(&self) -> Option<String> {
        let asset = self.new_display_asset.as_ref();

        let render = asset
            .and_then(|a| a.render_images.as_ref())
            .and_then(|images| images.first())
            .and_then(|img| remote(img.image.as_deref()));
        if render.is_some() {
            return render;
        }

        let materials = asset.and_then(|a| a.material_instances.as_ref());
        for material in materials.into_iter().flatten() {
            let Some(images) = &material.images else {
                continue;
            };
            let preferred = ["featured", "icon", "smallIcon", "Background"]
                .iter()
                .find_map(|key| images.get(*key).and_then(Value::as_str))
                .or_else(|| images.values().find_map(Value::as_str));
            if let Some(url) = remote(preferred) {
                return Some(url);
            }
        }

        let icon = self.first_item().and_then(|item| {
            let images = item.images.as_ref()?;
            remote(
                images
                    .featured
                    .as_deref()
                    .or(images.icon.as_deref())
                    .or(images.small_icon.as_deref()),
            )
        });
        if icon.is_some() {
            return icon;
        }

        self.bundle
            .as_ref()
            .and_then(|b| remote(b.image.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundle_entry() {
        let document = json!({
            "data": { "entries": [{
                "offerId": "bundle-1",
                "finalPrice": 2800,
                "regularPrice": 3400,
                "bundle": { "name": "Street Team", "image": "https://cdn.example/bundle.png" },
                "brItems": null
            }]}
        });

        let items = normalize(&document);
        assert_eq!(
            items,
            vec![CatalogItem {
                id: "bundle-1".to_string(),
                name: "Street Team".to_string(),
                price: 2800,
                regular_price: 3400,
                item_type: "Bundle".to_string(),
                rarity: "common".to_string(),
                series: None,
                image: Some("https://cdn.example/bundle.png".to_string()),
            }]
        );
    }

    #[test]
    fn test_series_overrides_rarity_and_render_image_wins() {
        let document = json!({
            "data": { "entries": [{
                "offerId": "o-2",
                "finalPrice": 1500,
                "brItems": [{
                    "name": "Iron Man",
                    "type": { "value": "outfit", "displayValue": "Outfit" },
                    "rarity": { "value": "epic" },
                    "series": { "value": "MARVEL SERIES", "backendValue": "MarvelSeries" },
                    "images": { "icon": "https://cdn.example/icon.png" }
                }],
                "newDisplayAsset": {
                    "renderImages": [{ "image": "https://cdn.example/render.png" }]
                }
            }]}
        });

        let item = &normalize(&document)[0];
        assert_eq!(item.rarity, "marvel");
        assert_eq!(item.series.as_deref(), Some("MARVEL SERIES"));
        assert_eq!(item.item_type, "Outfit");
        assert_eq!(item.regular_price, 1500);
        assert_eq!(item.image.as_deref(), Some("https://cdn.example/render.png"));
    }

    #[test]
    fn test_dev_name_fallback_and_bad_entries_skipped() {
        let document = json!({
            "data": { "entries": [
                { "offerId": "o-3", "finalPrice": 500, "devName": "[VIRTUAL]1 x Glider for 500 MtxCurrency" },
                { "finalPrice": 100 }
            ]}
        });

        let items = normalize(&document);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Glider");
        assert!(items[0].image.is_none());
    }

    #[test]
    fn test_missing_entries() {
        assert!(normalize(&json!({ "status": 404 })).is_empty());
    }
}
