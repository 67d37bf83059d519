use serde::Serialize;

use crate::encoder;

pub const JPEG_MIME: &str = "image/jpeg";

/// Token cap for every scan; the expected answer is a short JSON object.
pub const MAX_TOKENS: u32 = 300;

/// Dishes the scanner looks for on a menu.
pub const CANDIDATE_DISHES: [&str; 3] = ["tatar", "pizza", "spaghetti"];

/// Instruction sent with every image. The model answers in Polish menus'
/// own wording; the output shape is fixed and checked by the extractor.
pub const MENU_PROMPT: &str = "Załączam menu restauracji. Sprawdź, czy w menu znajdują się dania: \
tatar, pizza lub spaghetti. Jeżeli któreś z tych dań są dostępne, zwróć wszystkie pasujące dania \
w formacie JSON o strukturze: {\"dishes\": [{\"name\": \"nazwa_dania\", \"price\": \"cena_dania\"}]}. \
Jeżeli żadne z tych dań nie są dostępne, zwróć pusty obiekt {}";

/// Everything a provider needs for one streaming call.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub instruction: String,
    pub image_base64: String,
    pub mime_type: String,
    pub model_id: String,
    pub stream: bool,
    pub max_tokens: u32,
}

impl ModelRequest {
    pub fn menu_scan(image_base64: String, model_id: impl Into<String>) -> Self {
        Self {
            instruction: MENU_PROMPT.to_string(),
            image_base64,
            mime_type: JPEG_MIME.to_string(),
            model_id: model_id.into(),
            stream: true,
            max_tokens: MAX_TOKENS,
        }
    }

    pub fn data_uri(&self) -> String {
        encoder::data_uri(&self.mime_type, &self.image_base64)
    }
}
