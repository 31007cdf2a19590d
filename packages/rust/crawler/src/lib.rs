//! Catalog fetching, record extraction, and per-identifier workers.
//!
//! This crate provides:
//! - [`fetch`] — HTTP client and catalog URL conventions
//! - [`extract`] — Selector-based extraction of detail, category and description pages
//! - [`oracle`] — Existence checks and per-run fetch claims
//! - [`worker`] — The fetch-extract sequence for one identifier

pub mod extract;
pub mod fetch;
pub mod oracle;
pub mod worker;

pub use extract::{
    CategoryRef, DescriptionPage, MainPage, extract_category_page, extract_description_page,
    extract_main, image_basename, isolate_description,
};
pub use fetch::HttpFetcher;
pub use oracle::DedupOracle;
pub use worker::{ResultReceivers, ResultSenders, Worker, result_channels};

#[cfg(test)]
mod tests {
    use super::*;
    use orbitscrape_shared::NoradId;
    use scraper::Html;
    use url::Url;

    fn load_fixture(name: &str) -> Html {
        let path = format!("../../../fixtures/html/{name}");
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing fixture: {path}"));
        Html::parse_document(&content)
    }

    // -----------------------------------------------------------------------
    // Detail page
    // -----------------------------------------------------------------------

    #[test]
    fn detail_page_categories_in_order() {
        let doc = load_fixture("n2yo_satellite.html");
        let main = extract_main(&doc, "nssdc.gsfc.nasa.gov");

        let ids: Vec<NoradId> = main.categories.iter().map(|c| c.id().unwrap()).collect();
        assert_eq!(ids, vec![NoradId(4), NoradId(11)]);
        assert_eq!(main.categories[1].href, "/satellites/?c=11");
    }

    #[test]
    fn detail_page_description_link() {
        let doc = load_fixture("n2yo_satellite.html");
        let main = extract_main(&doc, "nssdc.gsfc.nasa.gov");

        let url = main.description_url.expect("description link");
        assert_eq!(url.host_str(), Some("nssdc.gsfc.nasa.gov"));
        assert!(url.as_str().contains("1998-067A"));
    }

    #[test]
    fn detail_page_foreign_domain_has_no_description() {
        let doc = load_fixture("n2yo_satellite.html");
        let main = extract_main(&doc, "celestrak.org");
        assert!(main.description_url.is_none());
    }

    // -----------------------------------------------------------------------
    // Category page
    // -----------------------------------------------------------------------

    #[test]
    fn category_page_line_after_heading() {
        let doc = load_fixture("n2yo_category.html");
        let description = extract_category_page(&doc);
        assert_eq!(
            description,
            "Crewed orbital platforms supporting long-duration human presence.\n"
        );
    }

    // -----------------------------------------------------------------------
    // Description page
    // -----------------------------------------------------------------------

    #[test]
    fn description_page_drops_blank_paragraphs() {
        let doc = load_fixture("nssdc_spacecraft.html");
        let page_url =
            Url::parse("https://nssdc.gsfc.nasa.gov/nmc/spacecraft/display.action?id=1998-067A")
                .unwrap();
        let page = extract_description_page(&doc, &page_url);

        assert_eq!(page.paragraphs.len(), 2);
        assert_eq!(
            page.description(),
            "The International Space Station is a modular space station in low Earth orbit.\n\
             It is a multinational collaborative project."
        );
    }

    #[test]
    fn description_page_gallery_urls_resolved() {
        let doc = load_fixture("nssdc_spacecraft.html");
        let page_url =
            Url::parse("https://nssdc.gsfc.nasa.gov/nmc/spacecraft/display.action?id=1998-067A")
                .unwrap();
        let page = extract_description_page(&doc, &page_url);

        let urls: Vec<&str> = page.image_urls.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://nssdc.gsfc.nasa.gov/planetary/image/iss_1.jpg",
                "https://nssdc.gsfc.nasa.gov/planetary/image/iss_2.jpg",
            ]
        );
        let names: Vec<String> = page.image_urls.iter().filter_map(image_basename).collect();
        assert_eq!(names, vec!["iss_1.jpg", "iss_2.jpg"]);
    }
}
