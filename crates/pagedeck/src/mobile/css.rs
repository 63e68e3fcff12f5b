use std::fmt;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};

use super::fit::StyleSheet;

/// At-rules whose block is a list of style rules.
const GROUPING_AT_RULES: &[&str] = &["media", "supports", "container", "layer"];

#[derive(Debug, Clone, PartialEq)]
struct Rule {
    selector: String,
    declarations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Style(Rule),
    Group { prelude: String, rules: Vec<Rule> },
    /// Kept as written: `@import`, `@font-face`, `@keyframes` and the like.
    Verbatim(String),
}

/// Stylesheet text as a list of rules the fitter can read and rewrite
/// without a browser.
///
/// Rule indices count style rules in source order, including those nested in
/// `@media` and other grouping rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CssText {
    items: Vec<Item>,
}

impl CssText {
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        Self {
            items: parse_rule_list(&mut parser),
        }
    }

    fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.items.iter().flat_map(|item| match item {
            Item::Style(rule) => std::slice::from_ref(rule),
            Item::Group { rules, .. } => rules.as_slice(),
            Item::Verbatim(_) => &[],
        })
    }

    fn rules_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.items.iter_mut().flat_map(|item| match item {
            Item::Style(rule) => std::slice::from_mut(rule),
            Item::Group { rules, .. } => rules.as_mut_slice(),
            Item::Verbatim(_) => &mut [],
        })
    }
}

fn parse_rule_list<'i>(input: &mut Parser<'i, '_>) -> Vec<Item> {
    let mut rule_parser = TopLevelRuleParser;
    let mut items = Vec::new();
    for result in StyleSheetParser::new(input, &mut rule_parser) {
        match result {
            Ok(item) => items.push(item),
            Err((_, source)) => log::debug!("skipped css rule {:?}", source.trim()),
        }
    }
    items
}

/// Everything left in `input`, as written.
fn remaining_source<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next().is_ok() {}
    input.slice_from(start).trim()
}

struct TopLevelRuleParser;

struct AtPrelude {
    name: String,
    text: String,
}

impl AtPrelude {
    fn header(&self) -> String {
        if self.text.is_empty() {
            format!("@{}", self.name)
        } else {
            format!("@{} {}", self.name, self.text)
        }
    }
}

impl<'i> AtRuleParser<'i> for TopLevelRuleParser {
    type Prelude = AtPrelude;
    type AtRule = Item;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Ok(AtPrelude {
            name: name.to_ascii_lowercase(),
            text: remaining_source(input).to_string(),
        })
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(Item::Verbatim(format!("{};", prelude.header())))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        if !GROUPING_AT_RULES.contains(&prelude.name.as_str()) {
            let body = remaining_source(input);
            return Ok(Item::Verbatim(format!("{} {{ {body} }}", prelude.header())));
        }
        let rules = parse_rule_list(input)
            .into_iter()
            .filter_map(|item| match item {
                Item::Style(rule) => Some(rule),
                other => {
                    log::debug!("dropped nested css rule in {}: {other:?}", prelude.header());
                    None
                }
            })
            .collect();
        Ok(Item::Group {
            prelude: prelude.header(),
            rules,
        })
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser {
    type Prelude = String;
    type QualifiedRule = Item;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Ok(remaining_source(input).to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut decl_parser = DeclarationListParser;
        let mut declarations = Vec::new();
        for result in RuleBodyParser::new(input, &mut decl_parser) {
            match result {
                Ok(decl) => declarations.push(decl),
                Err((_, source)) => log::debug!("skipped css declaration {:?}", source.trim()),
            }
        }
        Ok(Item::Style(Rule {
            selector: prelude,
            declarations,
        }))
    }
}

struct DeclarationListParser;

impl<'i> AtRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type AtRule = (String, String);
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type QualifiedRule = (String, String);
    type Error = ();
}

impl<'i> DeclarationParser<'i> for DeclarationListParser {
    type Declaration = (String, String);
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        Ok((name.to_string(), remaining_source(input).to_string()))
    }
}

impl<'i> RuleBodyItemParser<'i, (String, String), ()> for DeclarationListParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

impl StyleSheet for CssText {
    fn declarations(&self, property: &str) -> Vec<(usize, String)> {
        self.rules()
            .enumerate()
            .filter_map(|(i, rule)| {
                rule.declarations
                    .iter()
                    .find(|(name, _)| name == property)
                    .map(|(_, value)| (i, value.clone()))
            })
            .collect()
    }

    fn set_declaration(&mut self, rule: usize, property: &str, value: &str) {
        let Some(rule) = self.rules_mut().nth(rule) else {
            return;
        };
        match rule.declarations.iter_mut().find(|(name, _)| name == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => rule
                .declarations
                .push((property.to_string(), value.to_string())),
        }
    }
}

fn write_rule(f: &mut fmt::Formatter<'_>, rule: &Rule, indent: &str) -> fmt::Result {
    writeln!(f, "{indent}{} {{", rule.selector)?;
    for (name, value) in &rule.declarations {
        writeln!(f, "{indent}  {name}: {value};")?;
    }
    writeln!(f, "{indent}}}")
}

impl fmt::Display for CssText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match item {
                Item::Style(rule) => write_rule(f, rule, "")?,
                Item::Group { prelude, rules } => {
                    writeln!(f, "{prelude} {{")?;
                    for rule in rules {
                        write_rule(f, rule, "  ")?;
                    }
                    writeln!(f, "}}")?;
                }
                Item::Verbatim(text) => writeln!(f, "{text}")?,
            }
        }
        Ok(())
    }
}
