//! Step classification
//!
//! Steps are stored as raw value trees. [`Step::classify`] looks at a step
//! once and returns a borrowed view with the construct's fields normalised,
//! so consumers never re-inspect polymorphic shapes themselves.
//!
//! Classification checks distinguishing keys in a fixed priority order:
//! `variables`, `logic`/`if`, `loop`, `try`, `external_call`,
//! `data_transform`, `import`, `use`, `parallel`, and finally the leaf
//! action table.

use serde_json::{Map, Value};

/// How a leaf action's arguments are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// `(prompt, opts?)`
    Prompt,
    /// `(value, locate, opts?)`; flat form only
    ValueAndLocate,
    /// `(scrollParam, locate, opts?)`; flat form only
    Scroll,
    /// `(prompt, errorMessage?)`
    Assert,
    /// `(script)`
    Script,
    /// `(title, opts?)`
    Report,
    /// `sleep(ms)` helper, not a context method
    Sleep,
}

/// Call shape of one action keyword
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    /// YAML keyword
    pub keyword: &'static str,
    /// Method invoked on the execution context
    pub method: &'static str,
    /// Argument layout
    pub shape: CallShape,
    /// Whether the call returns a value worth binding to `name`
    pub returns_value: bool,
}

const fn action(
    keyword: &'static str,
    method: &'static str,
    shape: CallShape,
    returns_value: bool,
) -> ActionSpec {
    ActionSpec {
        keyword,
        method,
        shape,
        returns_value,
    }
}

/// Every action keyword the automation engine understands
pub const ACTIONS: &[ActionSpec] = &[
    action("ai", "aiAction", CallShape::Prompt, false),
    action("aiAction", "aiAction", CallShape::Prompt, false),
    action("aiTap", "aiTap", CallShape::Prompt, false),
    action("aiHover", "aiHover", CallShape::Prompt, false),
    action("aiRightClick", "aiRightClick", CallShape::Prompt, false),
    action("aiDoubleClick", "aiDoubleClick", CallShape::Prompt, false),
    action("aiInput", "aiInput", CallShape::ValueAndLocate, false),
    action(
        "aiKeyboardPress",
        "aiKeyboardPress",
        CallShape::ValueAndLocate,
        false,
    ),
    action("aiScroll", "aiScroll", CallShape::Scroll, false),
    action("aiQuery", "aiQuery", CallShape::Prompt, true),
    action("aiBoolean", "aiBoolean", CallShape::Prompt, true),
    action("aiNumber", "aiNumber", CallShape::Prompt, true),
    action("aiString", "aiString", CallShape::Prompt, true),
    action("aiAsk", "aiAsk", CallShape::Prompt, true),
    action("aiLocate", "aiLocate", CallShape::Prompt, true),
    action("aiAssert", "aiAssert", CallShape::Assert, false),
    action("aiWaitFor", "aiWaitFor", CallShape::Prompt, false),
    action("javascript", "evaluateJavaScript", CallShape::Script, true),
    action("logScreenshot", "logScreenshot", CallShape::Report, false),
    action("recordToReport", "recordToReport", CallShape::Report, false),
    action("sleep", "sleep", CallShape::Sleep, false),
];

/// Actions whose value must be a scalar with sibling options
///
/// The engine reads these in flat form; a nested object drops its fields.
pub const FLAT_FORM_ACTIONS: &[&str] = &["aiInput", "aiKeyboardPress", "aiScroll"];

/// Look up an action keyword
pub fn action_spec(keyword: &str) -> Option<&'static ActionSpec> {
    ACTIONS.iter().find(|spec| spec.keyword == keyword)
}

/// Kind tag of a classified step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Leaf automation action
    Action,
    /// `variables`
    VariableBinding,
    /// `logic`
    Conditional,
    /// `loop`
    Loop,
    /// `try`/`catch`/`finally`
    ExceptionBlock,
    /// `external_call`
    ExternalCall,
    /// `data_transform`
    DataTransform,
    /// `import`
    Import,
    /// `use`
    SubFlowInvocation,
    /// `parallel`
    ConcurrentGroup,
    /// Nothing recognisable
    Unknown,
}

impl StepKind {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::VariableBinding => "variables",
            Self::Conditional => "logic",
            Self::Loop => "loop",
            Self::ExceptionBlock => "try",
            Self::ExternalCall => "external_call",
            Self::DataTransform => "data_transform",
            Self::Import => "import",
            Self::SubFlowInvocation => "use",
            Self::ConcurrentGroup => "parallel",
            Self::Unknown => "unknown",
        }
    }
}

/// A nested flow owned by a step
#[derive(Debug, Clone, Copy)]
pub struct NestedFlow<'a> {
    /// Path segment appended to the owning step's path
    pub label: &'static str,
    /// Branch index for concurrent branches
    pub index: Option<usize>,
    /// The steps
    pub steps: &'a [Value],
}

impl NestedFlow<'_> {
    /// Path prefix for the nested steps under `parent`
    pub fn path_under(&self, parent: &str) -> String {
        match self.index {
            Some(i) => format!("{}.{}[{}].flow", parent, self.label, i),
            None => format!("{}.{}", parent, self.label),
        }
    }
}

/// Classified view of one step
#[derive(Debug, Clone)]
pub enum Step<'a> {
    /// Leaf automation action
    Action(ActionStep<'a>),
    /// Variable bindings
    VariableBinding(VariablesStep<'a>),
    /// If/then/else
    Conditional(ConditionalStep<'a>),
    /// for / while / repeat
    Loop(LoopStep<'a>),
    /// try / catch / finally
    ExceptionBlock(TryStep<'a>),
    /// HTTP request or shell command
    ExternalCall(ExternalCallStep<'a>),
    /// Collection pipeline
    DataTransform(DataTransformStep<'a>),
    /// Step-level import
    Import(ImportSpec<'a>),
    /// Sub-flow invocation
    SubFlowInvocation(UseStep<'a>),
    /// Concurrent branches
    ConcurrentGroup(ParallelStep<'a>),
    /// Unrecognised step
    Unknown(&'a Value),
}

/// Leaf action view
#[derive(Debug, Clone, Copy)]
pub struct ActionStep<'a> {
    /// Call shape
    pub spec: &'static ActionSpec,
    /// Value under the action keyword
    pub value: &'a Value,
    /// Whole step mapping (sibling options live here)
    pub map: &'a Map<String, Value>,
    /// Result binding
    pub name: Option<&'a str>,
}

/// `variables` view
#[derive(Debug, Clone, Copy)]
pub struct VariablesStep<'a> {
    /// Bindings, when the value is a mapping
    pub bindings: Option<&'a Map<String, Value>>,
}

/// Conditional view
#[derive(Debug, Clone, Copy)]
pub struct ConditionalStep<'a> {
    /// `if` condition
    pub condition: Option<&'a Value>,
    /// `then` flow
    pub then_flow: Option<&'a [Value]>,
    /// `else` flow
    pub else_flow: Option<&'a [Value]>,
}

/// Loop flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopType {
    /// Iterate a collection
    For,
    /// Iterate while a condition holds
    While,
    /// Iterate a fixed number of times
    Repeat,
}

impl LoopType {
    /// Parse a loop type name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "for" | "forEach" | "for_each" => Some(Self::For),
            "while" => Some(Self::While),
            "repeat" | "times" => Some(Self::Repeat),
            _ => None,
        }
    }
}

/// Loop view
#[derive(Debug, Clone, Copy)]
pub struct LoopStep<'a> {
    /// Raw `type` value
    pub type_name: Option<&'a str>,
    /// Parsed type
    pub loop_type: Option<LoopType>,
    /// Collection for `for`
    pub items: Option<&'a Value>,
    /// Item alias for `for`
    pub item_var: &'a str,
    /// Index alias
    pub index_var: Option<&'a str>,
    /// Condition for `while`
    pub condition: Option<&'a Value>,
    /// Safety bound for `while`
    pub max_iterations: Option<&'a Value>,
    /// Count for `repeat`
    pub count: Option<&'a Value>,
    /// Loop body
    pub body: Option<&'a [Value]>,
}

/// Catch clause
#[derive(Debug, Clone, Copy)]
pub struct CatchClause<'a> {
    /// Handler steps
    pub steps: &'a [Value],
    /// Name the caught error is bound to
    pub error_var: &'a str,
}

/// Exception block view
#[derive(Debug, Clone, Copy)]
pub struct TryStep<'a> {
    /// Protected steps
    pub body: Option<&'a [Value]>,
    /// Catch clause, if present
    pub catch: Option<CatchClause<'a>>,
    /// Finally steps, if present
    pub finally: Option<&'a [Value]>,
}

/// External call view
#[derive(Debug, Clone, Copy)]
pub struct ExternalCallStep<'a> {
    /// `http` or `shell`
    pub call_type: Option<&'a str>,
    /// Request URL
    pub url: Option<&'a Value>,
    /// HTTP verb
    pub method: Option<&'a str>,
    /// Request headers
    pub headers: Option<&'a Value>,
    /// Request body
    pub body: Option<&'a Value>,
    /// Shell command
    pub command: Option<&'a Value>,
    /// Result binding
    pub name: Option<&'a str>,
}

/// One data-transform operation
#[derive(Debug, Clone, Copy)]
pub struct TransformOp<'a> {
    /// Operation name
    pub operation: Option<&'a str>,
    /// Operation parameters
    pub params: &'a Map<String, Value>,
}

/// Data transform view
#[derive(Debug, Clone)]
pub struct DataTransformStep<'a> {
    /// Input collection
    pub source: Option<&'a Value>,
    /// Result binding
    pub name: Option<&'a str>,
    /// Operations in order
    pub operations: Vec<TransformOp<'a>>,
    /// Whether the chained form was used
    pub chained: bool,
}

/// Import view (step-level or top-level entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSpec<'a> {
    /// Imported file
    pub path: Option<&'a str>,
    /// Explicit alias
    pub alias: Option<&'a str>,
}

impl ImportSpec<'_> {
    /// Alias, falling back to an identifier derived from the file stem
    pub fn binding(&self) -> Option<String> {
        match self.alias {
            Some(alias) => Some(alias.to_string()),
            None => self.path.and_then(default_alias),
        }
    }
}

/// Sub-flow invocation view
#[derive(Debug, Clone, Copy)]
pub struct UseStep<'a> {
    /// Reference: a path or a `${...}` alias
    pub reference: Option<&'a Value>,
    /// Parameter map
    pub params: Option<&'a Value>,
    /// Result binding
    pub name: Option<&'a str>,
}

/// Concurrent group view
#[derive(Debug, Clone)]
pub struct ParallelStep<'a> {
    /// Branch flows, when a branch list is present
    pub branches: Option<Vec<&'a [Value]>>,
    /// Whether branch results are collected
    pub merge_results: bool,
    /// Binding for merged results
    pub name: Option<&'a str>,
}

impl ParallelStep<'_> {
    /// Binding that receives merged results, when merging
    pub fn results_binding(&self) -> Option<&str> {
        if self.merge_results {
            Some(self.name.unwrap_or(DEFAULT_PARALLEL_RESULTS))
        } else {
            None
        }
    }
}

/// Default binding for merged concurrent results
pub const DEFAULT_PARALLEL_RESULTS: &str = "parallelResults";

/// Read a flow: a sequence, or a mapping carrying one under `flow`/`steps`
pub fn as_flow(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items.as_slice()),
        Value::Object(map) => map
            .get("flow")
            .or_else(|| map.get("steps"))
            .and_then(Value::as_array)
            .map(Vec::as_slice),
        _ => None,
    }
}

/// Read a concurrent branch; a bare step mapping is a one-step branch
fn as_branch(value: &Value) -> Option<&[Value]> {
    as_flow(value).or_else(|| {
        value
            .as_object()
            .filter(|m| !m.is_empty())
            .map(|_| std::slice::from_ref(value))
    })
}

/// Derive an identifier from a file path's stem
pub fn default_alias(path: &str) -> Option<String> {
    let stem = std::path::Path::new(path).file_stem()?.to_str()?;
    let mut ident: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.is_empty() {
        return None;
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    Some(ident)
}

fn str_field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| map.get(*k))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn value_field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k)).filter(|v| !v.is_null())
}

impl<'a> Step<'a> {
    /// Classify a raw step
    pub fn classify(value: &'a Value) -> Step<'a> {
        let Some(map) = value.as_object() else {
            return Step::Unknown(value);
        };

        if let Some(bindings) = map.get("variables") {
            return Step::VariableBinding(VariablesStep {
                bindings: bindings.as_object(),
            });
        }

        if let Some(body) = map.get("logic") {
            let body = body.as_object().unwrap_or(map);
            return Step::Conditional(Self::conditional(body));
        }
        if map.contains_key("if") {
            return Step::Conditional(Self::conditional(map));
        }

        if let Some(body) = map.get("loop") {
            return Step::Loop(Self::loop_step(body));
        }

        if let Some(body) = map.get("try") {
            return Step::ExceptionBlock(Self::try_step(body, map));
        }

        if let Some(body) = map.get("external_call") {
            return Step::ExternalCall(Self::external_call(body, map));
        }

        if let Some(body) = map.get("data_transform") {
            return Step::DataTransform(Self::data_transform(body, map));
        }

        if let Some(body) = map.get("import") {
            return Step::Import(import_spec(body, Some(map)));
        }

        if let Some(reference) = map.get("use") {
            return Step::SubFlowInvocation(UseStep {
                reference: Some(reference).filter(|v| !v.is_null()),
                params: value_field(map, &["with", "params"]),
                name: str_field(map, &["name"]),
            });
        }

        if let Some(body) = map.get("parallel") {
            return Step::ConcurrentGroup(Self::parallel(body, map));
        }

        if let Some(spec) = ACTIONS.iter().find(|spec| map.contains_key(spec.keyword)) {
            return Step::Action(ActionStep {
                spec,
                value: &map[spec.keyword],
                map,
                name: str_field(map, &["name"]),
            });
        }

        Step::Unknown(value)
    }

    fn conditional(body: &'a Map<String, Value>) -> ConditionalStep<'a> {
        ConditionalStep {
            condition: value_field(body, &["if", "condition"]),
            then_flow: body.get("then").and_then(as_flow),
            else_flow: body.get("else").and_then(as_flow),
        }
    }

    fn loop_step(body: &'a Value) -> LoopStep<'a> {
        let empty = empty_map();
        let map = body.as_object().unwrap_or(empty);
        let type_name = str_field(map, &["type"]);
        LoopStep {
            type_name,
            loop_type: type_name.and_then(LoopType::parse),
            items: value_field(map, &["items", "collection", "in"]),
            item_var: str_field(map, &["itemVar", "item", "as"]).unwrap_or("item"),
            index_var: str_field(map, &["indexVar", "index"]),
            condition: value_field(map, &["condition", "while"]),
            max_iterations: value_field(map, &["maxIterations", "max_iterations"]),
            count: value_field(map, &["count", "times"]),
            body: value_field(map, &["flow", "steps"]).and_then(as_flow),
        }
    }

    fn try_step(body: &'a Value, map: &'a Map<String, Value>) -> TryStep<'a> {
        let catch = map
            .get("catch")
            .filter(|v| v.is_array() || v.is_object())
            .map(|v| CatchClause {
                steps: as_flow(v).unwrap_or_default(),
                error_var: v
                    .as_object()
                    .and_then(|m| str_field(m, &["errorVar", "as"]))
                    .unwrap_or("error"),
            });
        let finally = map
            .get("finally")
            .filter(|v| v.is_array() || v.is_object())
            .map(|v| as_flow(v).unwrap_or_default());

        TryStep {
            body: as_flow(body),
            catch,
            finally,
        }
    }

    fn external_call(body: &'a Value, outer: &'a Map<String, Value>) -> ExternalCallStep<'a> {
        let map = body.as_object().unwrap_or(outer);
        ExternalCallStep {
            call_type: str_field(map, &["type"]),
            url: value_field(map, &["url"]),
            method: str_field(map, &["method"]),
            headers: value_field(map, &["headers"]),
            body: value_field(map, &["body", "data"]),
            command: value_field(map, &["command", "cmd"]),
            name: str_field(map, &["name", "output"]).or_else(|| str_field(outer, &["name"])),
        }
    }

    fn data_transform(body: &'a Value, outer: &'a Map<String, Value>) -> DataTransformStep<'a> {
        let map = body.as_object().unwrap_or(outer);
        let source = value_field(map, &["source", "input"]);
        let name = str_field(map, &["name", "output"]).or_else(|| str_field(outer, &["name"]));

        if let Some(ops) = map.get("operations").and_then(Value::as_array) {
            let operations = ops
                .iter()
                .map(|op| match op.as_object() {
                    Some(params) => {
                        let operation = str_field(params, &["operation", "type"]).or_else(|| {
                            // `{ filter: { condition: ... } }` style
                            if params.len() == 1 {
                                params.keys().next().map(String::as_str)
                            } else {
                                None
                            }
                        });
                        let params = match operation.and_then(|o| params.get(o)) {
                            Some(Value::Object(inner)) => inner,
                            _ => params,
                        };
                        TransformOp { operation, params }
                    }
                    None => TransformOp {
                        operation: op.as_str(),
                        params: empty_map(),
                    },
                })
                .collect();
            return DataTransformStep {
                source,
                name,
                operations,
                chained: true,
            };
        }

        DataTransformStep {
            source,
            name,
            operations: vec![TransformOp {
                operation: str_field(map, &["operation", "type"]),
                params: map,
            }],
            chained: false,
        }
    }

    fn parallel(body: &'a Value, outer: &'a Map<String, Value>) -> ParallelStep<'a> {
        let (list, options) = match body {
            Value::Array(items) => (Some(items), outer),
            Value::Object(map) => (
                map.get("branches")
                    .or_else(|| map.get("tasks"))
                    .and_then(Value::as_array),
                map,
            ),
            _ => (None, outer),
        };

        let merge_results = ["merge_results", "mergeResults"]
            .iter()
            .find_map(|k| options.get(*k).or_else(|| outer.get(*k)))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        ParallelStep {
            branches: list.map(|items| items.iter().filter_map(as_branch).collect()),
            merge_results,
            name: str_field(options, &["name", "output"]).or_else(|| str_field(outer, &["name"])),
        }
    }

    /// Kind tag
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Action(_) => StepKind::Action,
            Step::VariableBinding(_) => StepKind::VariableBinding,
            Step::Conditional(_) => StepKind::Conditional,
            Step::Loop(_) => StepKind::Loop,
            Step::ExceptionBlock(_) => StepKind::ExceptionBlock,
            Step::ExternalCall(_) => StepKind::ExternalCall,
            Step::DataTransform(_) => StepKind::DataTransform,
            Step::Import(_) => StepKind::Import,
            Step::SubFlowInvocation(_) => StepKind::SubFlowInvocation,
            Step::ConcurrentGroup(_) => StepKind::ConcurrentGroup,
            Step::Unknown(_) => StepKind::Unknown,
        }
    }

    /// Every nested flow this step owns, in document order
    pub fn nested_flows(&self) -> Vec<NestedFlow<'a>> {
        let mut flows = Vec::new();
        let mut push = |label: &'static str, index: Option<usize>, steps: Option<&'a [Value]>| {
            if let Some(steps) = steps {
                flows.push(NestedFlow {
                    label,
                    index,
                    steps,
                });
            }
        };

        match self {
            Step::Conditional(c) => {
                push("then", None, c.then_flow);
                push("else", None, c.else_flow);
            }
            Step::Loop(l) => push("loop.flow", None, l.body),
            Step::ExceptionBlock(t) => {
                push("try", None, t.body);
                push("catch", None, t.catch.map(|c| c.steps));
                push("finally", None, t.finally);
            }
            Step::ConcurrentGroup(p) => {
                if let Some(branches) = &p.branches {
                    for (i, branch) in branches.iter().enumerate() {
                        push("parallel.branches", Some(i), Some(*branch));
                    }
                }
            }
            _ => {}
        }
        flows
    }

    /// Names this step binds in the enclosing scope (not counting nested flows)
    pub fn bound_names(&self) -> Vec<String> {
        match self {
            Step::VariableBinding(v) => v
                .bindings
                .map(|b| b.keys().cloned().collect())
                .unwrap_or_default(),
            Step::Action(a) => a.name.map(str::to_string).into_iter().collect(),
            Step::ExternalCall(e) => e.name.map(str::to_string).into_iter().collect(),
            Step::DataTransform(d) => d.name.map(str::to_string).into_iter().collect(),
            Step::Import(i) => i.binding().into_iter().collect(),
            Step::SubFlowInvocation(u) => u.name.map(str::to_string).into_iter().collect(),
            Step::ConcurrentGroup(p) => p.results_binding().map(str::to_string).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Names visible only inside this step's nested flows (loop and catch aliases)
    pub fn scoped_names(&self) -> Vec<&'a str> {
        match self {
            Step::Loop(l) => {
                let mut names = Vec::new();
                if l.loop_type == Some(LoopType::For) {
                    names.push(l.item_var);
                }
                if let Some(index) = l.index_var {
                    names.push(index);
                }
                names
            }
            Step::ExceptionBlock(t) => t.catch.map(|c| c.error_var).into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// Read an import entry: a bare path string or `{path, as}`
///
/// `sibling` supplies an `as` key written next to a step-level `import`.
pub fn import_spec<'a>(value: &'a Value, sibling: Option<&'a Map<String, Value>>) -> ImportSpec<'a> {
    let sibling_alias = sibling.and_then(|m| str_field(m, &["as", "alias"]));
    match value {
        Value::String(path) => ImportSpec {
            path: Some(path.as_str()).filter(|p| !p.trim().is_empty()),
            alias: sibling_alias,
        },
        Value::Object(map) => ImportSpec {
            path: str_field(map, &["path", "file", "flow", "from"]),
            alias: str_field(map, &["as", "alias", "name"]).or(sibling_alias),
        },
        _ => ImportSpec {
            path: None,
            alias: sibling_alias,
        },
    }
}

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: once_cell::sync::Lazy<Map<String, Value>> = once_cell::sync::Lazy::new(Map::new);
    &EMPTY
}
