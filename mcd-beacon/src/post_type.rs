//! Registration descriptor for the report content type.

use crate::report::POST_TYPE;
use serde::{Deserialize, Serialize};

/// Display labels for the report content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLabels {
    pub name: String,
    pub singular_name: String,
    pub menu_name: String,
    pub name_admin_bar: String,
    pub add_new: String,
    pub add_new_item: String,
    pub edit_item: String,
    pub new_item: String,
    pub view_item: String,
    pub search_items: String,
    pub not_found: String,
    pub not_found_in_trash: String,
    pub all_items: String,
    pub parent_item: String,
    pub parent_item_colon: String,
    pub archive_title: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        const SINGULAR: &str = "Content Security Policy Report";
        const PLURAL: &str = "Content Security Policy Reports";

        Self {
            name: SINGULAR.to_string(),
            singular_name: SINGULAR.to_string(),
            menu_name: PLURAL.to_string(),
            name_admin_bar: PLURAL.to_string(),
            add_new: "Add New".to_string(),
            add_new_item: format!("Add New {}", SINGULAR),
            edit_item: format!("Edit {}", SINGULAR),
            new_item: format!("New {}", SINGULAR),
            view_item: format!("View {}", SINGULAR),
            search_items: format!("Search {}", PLURAL),
            not_found: format!("No {} found", PLURAL),
            not_found_in_trash: format!("No {} found in trash", PLURAL),
            all_items: format!("All {}", PLURAL),
            parent_item: format!("Parent {}", SINGULAR),
            parent_item_colon: format!("Parent {}:", SINGULAR),
            archive_title: PLURAL.to_string(),
        }
    }
}

/// Content type registration arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportType {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub publicly_queryable: bool,
    pub exclude_from_search: bool,
    pub show_in_nav_menus: bool,
    pub show_ui: bool,
    pub show_in_menu: bool,
    pub show_in_admin_bar: bool,
    pub menu_position: u32,
    pub menu_icon: Option<String>,
    pub can_export: bool,
    pub delete_with_user: bool,
    pub hierarchical: bool,
    pub has_archive: bool,
    pub query_var: bool,
    pub rewrite: bool,
    pub supports: Vec<String>,
    pub labels: ReportLabels,
}

impl ReportType {
    /// The `csp-report` type: visible in the admin menu, hidden from
    /// front-end queries, search, navigation and export.
    pub fn csp_report() -> Self {
        Self {
            name: POST_TYPE.to_string(),
            description: "Holds Content Security Policy violation logs.".to_string(),
            public: true,
            publicly_queryable: false,
            exclude_from_search: true,
            show_in_nav_menus: false,
            show_ui: true,
            show_in_menu: true,
            show_in_admin_bar: false,
            menu_position: 25,
            menu_icon: None,
            can_export: false,
            delete_with_user: false,
            hierarchical: false,
            has_archive: false,
            query_var: true,
            rewrite: false,
            supports: vec!["title".to_string()],
            labels: ReportLabels::default(),
        }
    }

    pub fn supports(&self, feature: &str) -> bool {
        self.supports.iter().any(|f| f == feature)
    }
}
