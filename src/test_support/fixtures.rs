//! Fruit candidates shared by unit tests.
//!
//! | candidate | priority | colour          | other                                  |
//! |-----------|----------|-----------------|----------------------------------------|
//! | apple     | DEFAULT  | red, yellow     | producer (default "Jacques")           |
//! | pear      | DEFAULT  | green           | producer (default "Jacques"), not reusable |
//! | wild      | TOOLBOX  | green           | origin (optional, outcast Scotland/Ireland) |

use crate::collector::Declaration;
use crate::core::{AttributeDelta, Fragment};

/// Attributes every fruit shares.
pub fn fruit_fragment() -> Fragment {
    Fragment::new()
        .attr(
            "colour",
            AttributeDelta::new().values(["red", "green", "yellow"]).info("skin colour"),
        )
        .info("A fruit")
}

pub fn apple() -> Declaration {
    Declaration::new("apple")
        .tag("fruit")
        .fragment(fruit_fragment())
        .fragment(
            Fragment::new()
                .attr("colour", AttributeDelta::new().values(["red", "yellow"]))
                .attr("producer", AttributeDelta::new().default_value("Jacques")),
        )
}

pub fn pear() -> Declaration {
    Declaration::new("pear")
        .tag("fruit")
        .reusable(false)
        .fragment(fruit_fragment())
        .fragment(
            Fragment::new()
                .attr("colour", AttributeDelta::new().values(["green"]))
                .attr("producer", AttributeDelta::new().default_value("Jacques")),
        )
}

pub fn wild() -> Declaration {
    Declaration::new("wild")
        .tag("fruit")
        .fragment(fruit_fragment())
        .fragment(
            Fragment::new()
                .attr("colour", AttributeDelta::new().values(["green"]))
                .attr(
                    "origin",
                    AttributeDelta::new()
                        .optional()
                        .outcast(["Scotland", "Ireland"])
                        .remap("Eire", "Ireland"),
                )
                .priority("toolbox"),
        )
}

/// Catalog text declaring the same fruits as the builders above.
pub const ORCHARD_CATALOG: &str = r#"
[fragment.fruit]
info = "A fruit"
attr.colour = { values = ["red", "green", "yellow"], info = "skin colour" }

[[candidate]]
name = "apple"
tags = ["fruit"]
extends = ["fruit"]
attr.colour = { values = ["red", "yellow"] }
attr.producer = { default = "Jacques" }

[[candidate]]
name = "pear"
tags = ["fruit"]
extends = ["fruit"]
reusable = false
attr.colour = { values = ["green"] }
attr.producer = { default = "Jacques" }

[[candidate]]
name = "wild"
tags = ["fruit"]
extends = ["fruit"]
priority = "toolbox"
attr.colour = { values = ["green"] }
attr.origin = { optional = true, outcast = ["Scotland", "Ireland"], remap = { Eire = "Ireland" } }
"#;
