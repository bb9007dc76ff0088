//! Reference documentation lookup for the diagram DSL.
//!
//! A fixed set of topic documents, addressed by normalized keyword. Unknown
//! keywords resolve to nothing; callers list the valid set instead of failing.

/// Canonical topics, in the order `keywords()` reports them.
const TOPICS: &[(&str, &str)] = &[
    (
        "shapes",
        "D2 shapes:\n\
         A shape is declared by naming it: `server`. Labels default to the key; \
         override with `server: Main API`. Set the geometry with the `shape` \
         keyword inside a block:\n\
         ```\n\
         db: Users DB {\n\
           shape: cylinder\n\
         }\n\
         ```\n\
         Common shape values: rectangle (default), square, circle, oval, diamond, \
         cylinder, queue, package, step, callout, stored_data, person, hexagon, \
         cloud, document, image, sql_table, class.",
    ),
    (
        "connections",
        "D2 connections:\n\
         Connect shapes with `->` (directed), `<-` (reverse), `<->` (both), or \
         `--` (undirected): `client -> server: request`. The text after the colon \
         is the connection label. Chains work in one line: `a -> b -> c`. \
         Repeated declarations create parallel connections, not duplicates. \
         Reference nested shapes with dots: `web.frontend -> api.router`. \
         Arrowheads are styled via `source-arrowhead` / `target-arrowhead` \
         blocks, e.g. `a -> b: { target-arrowhead.shape: diamond }`.",
    ),
    (
        "containers",
        "D2 containers:\n\
         Nest shapes to group them:\n\
         ```\n\
         vpc: Production VPC {\n\
           web: Web tier\n\
           db: Database {\n\
             shape: cylinder\n\
           }\n\
         }\n\
         ```\n\
         Containers are ordinary shapes and can be connected as a whole \
         (`vpc -> internet`) or by child (`vpc.web -> vpc.db`). Declaring \
         `a.b.c` implicitly creates the intermediate containers.",
    ),
    (
        "styles",
        "D2 styles:\n\
         Attach a `style` block to any shape or connection:\n\
         ```\n\
         server.style: {\n\
           fill: \"#f5f5f5\"\n\
           stroke: \"#0d32b2\"\n\
           stroke-width: 2\n\
           stroke-dash: 3\n\
           border-radius: 4\n\
           shadow: true\n\
           opacity: 0.9\n\
           font-size: 14\n\
           font-color: black\n\
         }\n\
         ```\n\
         Colors are CSS color names or hex strings (quote hex values). \
         `style.3d: true` and `style.multiple: true` work on rectangles; \
         `style.animated: true` works on connections.",
    ),
    (
        "icons",
        "D2 icons:\n\
         Any shape can carry an icon by URL: `server.icon: https://…/server.svg`. \
         To show only the image, set the shape to image:\n\
         ```\n\
         s3: Amazon S3 {\n\
           shape: image\n\
           icon: https://icons.terrastruct.com/aws%2FStorage%2FAmazon-Simple-Storage-Service-S3.svg\n\
         }\n\
         ```\n\
         With any other shape the icon is placed inside the shape next to the \
         label. Use the find_icon tool to discover catalog URLs.",
    ),
    (
        "text",
        "D2 text and labels:\n\
         Standalone text uses the markdown shape:\n\
         ```\n\
         explanation: |md\n\
           # Request path\n\
           *All* traffic passes the edge proxy.\n\
         |\n\
         ```\n\
         Code blocks use a language tag instead of `md`. Shape labels accept \
         plain strings only; quote labels containing reserved characters, e.g. \
         `svc: \"auth: v2\"`.",
    ),
    (
        "sql-tables",
        "D2 SQL tables:\n\
         ```\n\
         users: {\n\
           shape: sql_table\n\
           id: int {constraint: primary_key}\n\
           email: varchar\n\
           org_id: int {constraint: foreign_key}\n\
         }\n\
         users.org_id -> orgs.id\n\
         ```\n\
         Each key inside the table is a column; the value is its type. \
         Constraints render as badges. Connections between columns draw \
         relationship lines between the tables.",
    ),
    (
        "classes",
        "D2 classes:\n\
         UML class diagrams use `shape: class`; members with parentheses are \
         methods, others are fields. Visibility prefixes: `+` public (default), \
         `-` private, `#` protected.\n\
         Reusable style classes are declared under the `classes` key and applied \
         with `shape.class: name`:\n\
         ```\n\
         classes: {\n\
           important: {style.stroke-width: 3}\n\
         }\n\
         core.class: important\n\
         ```",
    ),
    (
        "layout",
        "D2 layout:\n\
         `direction: up | down | left | right` at the top level (or inside a \
         container) sets flow direction; default is down. Positions are computed \
         by the layout engine — there are no manual coordinates. `near` pins a \
         shape relative to the diagram (`legend.near: bottom-center`) or to \
         another shape by key. Grid layouts use `grid-rows` / `grid-columns` \
         inside a container.",
    ),
    (
        "variables",
        "D2 variables:\n\
         Declare reusable values under `vars` and substitute with `${…}`:\n\
         ```\n\
         vars: {\n\
           primary: \"#0d32b2\"\n\
         }\n\
         server.style.stroke: ${primary}\n\
         ```\n\
         Substitutions work in labels and values alike. Spread substitutions \
         (`...${block}`) splice a map into place.",
    ),
];

/// Alias → canonical keyword. Applied after normalization.
const ALIASES: &[(&str, &str)] = &[
    ("shape", "shapes"),
    ("edges", "connections"),
    ("arrows", "connections"),
    ("links", "connections"),
    ("nesting", "containers"),
    ("groups", "containers"),
    ("container", "containers"),
    ("styling", "styles"),
    ("style", "styles"),
    ("colors", "styles"),
    ("themes", "styles"),
    ("images", "icons"),
    ("icon", "icons"),
    ("labels", "text"),
    ("markdown", "text"),
    ("sql", "sql-tables"),
    ("tables", "sql-tables"),
    ("sql-table", "sql-tables"),
    ("class", "classes"),
    ("uml", "classes"),
    ("layouts", "layout"),
    ("direction", "layout"),
    ("grid", "layout"),
    ("vars", "variables"),
    ("substitutions", "variables"),
];

/// Fixed in-process documentation library.
#[derive(Default)]
pub struct DocLibrary;

impl DocLibrary {
    pub fn new() -> Self {
        Self
    }

    /// Trim, lowercase, and collapse whitespace runs to hyphens, so
    /// "SQL Tables" and "sql-tables" address the same topic.
    pub fn normalize(raw: &str) -> String {
        raw.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Resolve a keyword (normalizing and de-aliasing) to its document.
    pub fn resolve(&self, keyword: &str) -> Option<&'static str> {
        let normalized = Self::normalize(keyword);
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map_or(normalized.as_str(), |(_, canonical)| canonical);
        TOPICS
            .iter()
            .find(|(keyword, _)| *keyword == canonical)
            .map(|(_, doc)| *doc)
    }

    /// All valid canonical keywords, in documentation order.
    pub fn keywords(&self) -> Vec<&'static str> {
        TOPICS.iter().map(|(keyword, _)| *keyword).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(DocLibrary::normalize("  SQL   Tables "), "sql-tables");
        assert_eq!(DocLibrary::normalize("Connections"), "connections");
    }

    #[test]
    fn test_alias_resolves_to_same_doc() {
        let docs = DocLibrary::new();
        let canonical = docs.resolve("connections").expect("canonical topic");
        let aliased = docs.resolve("edges").expect("alias");
        assert_eq!(canonical, aliased);
    }

    #[test]
    fn test_unknown_keyword_is_none() {
        let docs = DocLibrary::new();
        assert!(docs.resolve("bogus").is_none());
    }

    #[test]
    fn test_every_alias_points_at_a_real_topic() {
        let docs = DocLibrary::new();
        for (alias, canonical) in ALIASES {
            assert!(
                docs.resolve(canonical).is_some(),
                "alias '{alias}' targets missing topic '{canonical}'"
            );
        }
    }

    #[test]
    fn test_keywords_listed_in_topic_order() {
        let docs = DocLibrary::new();
        let keywords = docs.keywords();
        assert_eq!(keywords.first(), Some(&"shapes"));
        assert!(keywords.contains(&"sql-tables"));
        assert_eq!(keywords.len(), TOPICS.len());
    }
}
