use indexmap::IndexMap;

/// CSS class hints handed to the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormStyle {
    /// The form element, when validation is enabled
    pub form: String,
    /// Every row container
    pub row: String,
    /// Added to a row container holding more than one field
    pub multiple_in_row: String,
    /// Field group, followed by ` col-{span}`
    pub group: String,
    /// Field label
    pub label: String,
    /// Wrapper around the widget
    pub wrapper: String,
    /// The widget itself
    pub control: String,
}

impl Default for FormStyle {
    fn default() -> Self {
        Self {
            form: "m-form-validation".into(),
            row: "m-form-row".into(),
            multiple_in_row: "multiple-forms-in-row".into(),
            group: "form-group".into(),
            label: "col-sm-12 col-form-label".into(),
            wrapper: "col-sm-12".into(),
            control: "m-form-control".into(),
        }
    }
}

impl FormStyle {
    /// Class of a row container holding `members` fields
    pub fn row_class(&self, members: usize) -> String {
        if members > 1 {
            format!("{} {}", self.row, self.multiple_in_row)
        } else {
            self.row.clone()
        }
    }

    /// Class of a field group spanning `span` columns
    pub fn group_class(&self, span: u8) -> String {
        format!("{} col-{span}", self.group)
    }
}

/// How a form behaves and renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormOptions {
    /// Run the validator on submit, and emit per-field validation hints.
    /// Default: on.
    pub enable_validation: bool,

    /// Render as cells of a table row: no form element, no row containers.
    pub in_table_row: bool,

    /// The form is the filter row of a table
    pub filter_row: bool,

    /// Columns in a full row. Default: 12.
    pub column_span: u8,

    /// CSS class hints
    pub style: FormStyle,

    /// Extra attributes for the form element
    pub form_attributes: IndexMap<String, String>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            enable_validation: true,
            in_table_row: false,
            filter_row: false,
            column_span: 12,
            style: FormStyle::default(),
            form_attributes: IndexMap::new(),
        }
    }
}

impl FormOptions {
    /// Turns validation on or off
    pub fn with_validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Renders the form as a table row
    pub fn with_table_row(mut self, in_table_row: bool) -> Self {
        self.in_table_row = in_table_row;
        self
    }

    /// Marks the form as a filter row
    pub fn with_filter_row(mut self, filter_row: bool) -> Self {
        self.filter_row = filter_row;
        self
    }

    /// Sets the number of columns in a full row
    pub fn with_column_span(mut self, column_span: u8) -> Self {
        self.column_span = column_span;
        self
    }

    /// Replaces the CSS class hints
    pub fn with_style(mut self, style: FormStyle) -> Self {
        self.style = style;
        self
    }

    /// Adds an attribute to the form element
    pub fn with_form_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_attributes.insert(name.into(), value.into());
        self
    }
}
