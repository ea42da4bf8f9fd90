use web_sys as web;

const OVERLAY_ID: &str = "viz-overlay";
const OVERLAY_STYLE: &str = "position:absolute;inset:0;display:flex;align-items:center;\
justify-content:center;padding:2em;text-align:center;color:#eee;background:rgba(0,0,0,0.85);\
font:16px sans-serif";

/// Show `message` over `container`, creating the overlay on first use.
pub fn show_message(document: &web::Document, container: &web::Element, message: &str) {
    let el = match document.get_element_by_id(OVERLAY_ID) {
        Some(el) => el,
        None => {
            let Ok(el) = document.create_element("div") else {
                return;
            };
            el.set_id(OVERLAY_ID);
            let _ = container.append_child(&el);
            el
        }
    };
    let _ = el.set_attribute("style", OVERLAY_STYLE);
    el.set_text_content(Some(message));
}

#[inline]
pub fn hide(document: &web::Document) {
    if let Some(el) = document.get_element_by_id(OVERLAY_ID) {
        let _ = el.set_attribute("style", "display:none");
    }
}
