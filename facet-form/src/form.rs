use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::fmt;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};

use crate::binding::{ChangeNotifier, bind_with};
use crate::{
    BindingMode, ComplexContext, ContainerMember, DispatchFlags, Field, FieldHints,
    FieldIdentifier, FormContainer, FormError, FormHints, FormId, FormModel, FormOptions,
    GeneratorContext, InputSlot, PropertyField, Renderer, ResolvedField, RowGroup, RowHints,
    ValidationContext, Validator, Value, Widget, group_by_row, reconcile, select_widget,
};

/// Field name to current value, for every field edited since the last submit
pub type ChangeSet = IndexMap<String, Value>;

/// What a submit handler may fail with
pub type HandlerError = Box<dyn core::error::Error + Send + Sync + 'static>;

type SubmitHandler<M> = Box<dyn FnMut(&SubmitArgs<'_, M>) -> Result<(), HandlerError>>;
type ValueChangedHandler<M> = Box<dyn FnMut(&ValueChanged<'_, M>)>;

/// Passed to the valid-submit handler
#[derive(Debug)]
pub struct SubmitArgs<'a, M> {
    /// The model, as it is now
    pub model: &'a M,
    /// What changed since the last submit
    pub changes: &'a ChangeSet,
    /// The context the validator ran with
    pub validation: &'a ValidationContext,
    /// Whether a user action triggered the submit
    pub user_interacted: bool,
}

/// Passed to the value-changed handler after every committed edit
#[derive(Debug)]
pub struct ValueChanged<'a, M> {
    /// Name of the edited field
    pub field: &'a str,
    /// The value now in the model
    pub value: &'a Value,
    /// The model
    pub model: &'a M,
}

/// How a submit request ended
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Validation passed; carries the change set handed to the handler
    Submitted(ChangeSet),
    /// Validation failed on a standalone form; nothing was submitted
    Invalid,
    /// Another submit was running; this one runs right after it
    Queued,
}

/// Handle to an explicitly registered field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(u64);

struct FormCore<M, R> {
    id: FormId,
    model: RefCell<Rc<RefCell<M>>>,
    fields: RefCell<Vec<(FieldKey, Field<M, R>)>>,
    next_key: Cell<u64>,
    dirty: RefCell<IndexSet<FieldIdentifier>>,
    options: FormOptions,
    container: Option<Rc<dyn FormContainer>>,
    validator: Option<Box<dyn Validator<M>>>,
    on_valid_submit: RefCell<Option<SubmitHandler<M>>>,
    on_value_changed: RefCell<Option<ValueChangedHandler<M>>>,
    validation: RefCell<ValidationContext>,
    busy: Cell<bool>,
    queue: RefCell<VecDeque<bool>>,
}

/// An editable form over a model.
///
/// The form shares the model with its caller through `Rc<RefCell<M>>` and
/// never copies it. Everything runs on one thread.
pub struct Form<M, R> {
    core: Rc<FormCore<M, R>>,
}

/// Builder for [`Form`]
pub struct FormBuilder<M, R> {
    model: Rc<RefCell<M>>,
    options: FormOptions,
    fields: Vec<Field<M, R>>,
    container: Option<Rc<dyn FormContainer>>,
    validator: Option<Box<dyn Validator<M>>>,
    on_valid_submit: Option<SubmitHandler<M>>,
    on_value_changed: Option<ValueChangedHandler<M>>,
}

impl<M: FormModel, R: Renderer + 'static> FormBuilder<M, R> {
    /// Sets the options
    pub fn options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds an explicit field. Once any field is added, only explicit fields
    /// are rendered.
    pub fn field(mut self, field: impl Into<Field<M, R>>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Makes the form a member of `container`
    pub fn container(mut self, container: Rc<dyn FormContainer>) -> Self {
        self.container = Some(container);
        self
    }

    /// Sets the validator run on submit
    pub fn validator(mut self, validator: impl Validator<M> + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Sets the handler called after every valid submit
    pub fn on_valid_submit(
        mut self,
        handler: impl FnMut(&SubmitArgs<'_, M>) -> Result<(), HandlerError> + 'static,
    ) -> Self {
        self.on_valid_submit = Some(Box::new(handler));
        self
    }

    /// Sets the handler called after every committed edit
    pub fn on_value_changed(mut self, handler: impl FnMut(&ValueChanged<'_, M>) + 'static) -> Self {
        self.on_value_changed = Some(Box::new(handler));
        self
    }

    /// Builds the form and registers it with its container
    pub fn build(self) -> Form<M, R> {
        let fields = self
            .fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| (FieldKey(i as u64), field))
            .collect::<Vec<_>>();
        let core = Rc::new(FormCore {
            id: FormId::new(),
            model: RefCell::new(self.model),
            next_key: Cell::new(fields.len() as u64),
            fields: RefCell::new(fields),
            dirty: RefCell::new(IndexSet::new()),
            options: self.options,
            container: self.container,
            validator: self.validator,
            on_valid_submit: RefCell::new(self.on_valid_submit),
            on_value_changed: RefCell::new(self.on_value_changed),
            validation: RefCell::new(ValidationContext::default()),
            busy: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
        });

        if let Some(container) = &core.container {
            let member: Weak<FormCore<M, R>> = Rc::downgrade(&core);
            container.register_form(member);
            debug!("Form {} registered with its container", core.id);
        }

        Form { core }
    }
}

impl<M: FormModel, R: Renderer + 'static> Form<M, R> {
    /// A standalone form with default options
    pub fn new(model: Rc<RefCell<M>>) -> Self {
        Self::builder(model).build()
    }

    /// Returns a builder for Form
    pub fn builder(model: Rc<RefCell<M>>) -> FormBuilder<M, R> {
        FormBuilder {
            model,
            options: FormOptions::default(),
            fields: Vec::new(),
            container: None,
            validator: None,
            on_valid_submit: None,
            on_value_changed: None,
        }
    }

    /// Id of this form; input ids start with it
    pub fn id(&self) -> FormId {
        self.core.id
    }

    /// The model currently edited
    pub fn model(&self) -> Rc<RefCell<M>> {
        self.core.current_model()
    }

    /// Replaces the model. Fields already marked dirty stay dirty and are read
    /// from the new model on the next submit.
    pub fn set_model(&self, model: Rc<RefCell<M>>) {
        debug!("Form {}: model replaced", self.core.id);
        *self.core.model.borrow_mut() = model;
    }

    /// The options the form was built with
    pub fn options(&self) -> &FormOptions {
        &self.core.options
    }

    /// Replaces the valid-submit handler
    pub fn on_valid_submit(
        &self,
        handler: impl FnMut(&SubmitArgs<'_, M>) -> Result<(), HandlerError> + 'static,
    ) {
        *self.core.on_valid_submit.borrow_mut() = Some(Box::new(handler));
    }

    /// Replaces the value-changed handler
    pub fn on_value_changed(&self, handler: impl FnMut(&ValueChanged<'_, M>) + 'static) {
        *self.core.on_value_changed.borrow_mut() = Some(Box::new(handler));
    }

    /// Adds an explicit field
    pub fn register_field(&self, field: impl Into<Field<M, R>>) -> FieldKey {
        let key = FieldKey(self.core.next_key.get());
        self.core.next_key.set(key.0 + 1);
        self.core.fields.borrow_mut().push((key, field.into()));
        key
    }

    /// Removes an explicit field
    pub fn unregister_field(&self, key: FieldKey) -> Option<Field<M, R>> {
        let mut fields = self.core.fields.borrow_mut();
        let index = fields.iter().position(|(k, _)| *k == key)?;
        Some(fields.remove(index).1)
    }

    /// Removes every explicit field; the form goes back to showing every
    /// property of the model
    pub fn clear_fields(&self) {
        self.core.fields.borrow_mut().clear();
    }

    /// The fields that would be rendered, after reconciliation
    pub fn fields(&self) -> Result<Vec<ResolvedField<M, R>>, FormError> {
        let model = self.core.current_model();
        let model = model.try_borrow().map_err(|_| FormError::ModelBusy)?;
        reconcile(&self.core.field_list(), &*model)
    }

    /// Whether any field was edited since the last successful submit
    pub fn has_unsaved_changes(&self) -> bool {
        self.core.has_unsaved_changes()
    }

    /// Fields edited since the last successful submit, in edit order
    pub fn dirty_fields(&self) -> Vec<FieldIdentifier> {
        self.core.dirty.borrow().iter().cloned().collect()
    }

    /// The validation context of the last submit
    pub fn validation(&self) -> ValidationContext {
        self.core.validation.borrow().clone()
    }

    /// Runs the submit pipeline.
    ///
    /// Fails with [`FormError::Validation`] when the form belongs to a
    /// container and the model is invalid; a standalone form reports
    /// [`SubmitOutcome::Invalid`] instead.
    pub fn submit(&self, user_interacted: bool) -> Result<SubmitOutcome, FormError> {
        self.core.submit(user_interacted)
    }

    /// A key was released inside one of the inputs. `Enter` submits a
    /// standalone form.
    pub fn key_up(&self, key: &str) -> Result<Option<SubmitOutcome>, FormError> {
        if key != "Enter" || self.core.container.is_some() {
            return Ok(None);
        }
        self.core.submit(true).map(Some)
    }

    /// The form element was submitted; lets the container know.
    pub fn on_form_submit(&self) -> Result<(), FormError> {
        match &self.core.container {
            Some(container) => container.notify_submit(),
            None => Ok(()),
        }
    }

    /// Drives `renderer` through the whole form.
    pub fn render(&self, renderer: &mut R) -> Result<(), FormError> {
        let model = self.core.current_model();
        let fields = self.core.field_list();
        let resolved = {
            let model = model.try_borrow().map_err(|_| FormError::ModelBusy)?;
            debug!(
                "Rendering {} with {} explicit field(s)",
                model.type_identifier(),
                fields.len()
            );
            reconcile(&fields, &*model)?
        };

        // refuse to render anything if a field has no type
        for field in &resolved {
            if let Some(descriptor) = &field.descriptor {
                if descriptor.shape().is_none() {
                    return Err(FormError::UnresolvedType {
                        field: descriptor.name().to_string(),
                    });
                }
            }
        }

        let options = &self.core.options;
        // the position keeps input ids apart when names repeat
        let groups = group_by_row(resolved.into_iter().enumerate(), |(_, field)| {
            field.attributes.row()
        });

        if !options.in_table_row {
            renderer.open_form(&FormHints {
                class: options
                    .enable_validation
                    .then_some(options.style.form.as_str()),
                attributes: &options.form_attributes,
            });
            renderer.validation_summary();
        }

        for group in &groups {
            self.render_row(renderer, &model, group)?;
        }

        if !options.in_table_row {
            renderer.submit_button();
            renderer.close_form();
        }
        Ok(())
    }

    fn render_row(
        &self,
        renderer: &mut R,
        model: &Rc<RefCell<M>>,
        group: &RowGroup<(usize, ResolvedField<M, R>)>,
    ) -> Result<(), FormError> {
        let options = &self.core.options;
        let shared = group.is_shared() && !options.in_table_row;
        let span = group.span(options.column_span);

        if shared {
            renderer.open_row(&RowHints {
                key: group.key,
                class: options.style.row_class(group.members.len()),
            });
        }

        for (position, field) in &group.members {
            match &field.field {
                Field::Generator(generator) => {
                    if options.in_table_row {
                        renderer.open_cell(None);
                    }
                    (generator.template())(&mut *renderer, &GeneratorContext { form: self });
                    if options.in_table_row {
                        renderer.close_cell();
                    }
                }
                Field::Property(property) => {
                    let input_id = self.input_id(*position, property);
                    self.render_property(renderer, model, field, property, &input_id, span, shared)?
                }
                Field::Complex(complex) => {
                    let property = complex.field();
                    let input_id = self.input_id(*position, property);
                    self.render_property(renderer, model, field, property, &input_id, span, shared)?
                }
            }
        }

        if shared {
            renderer.close_row();
        }
        Ok(())
    }

    /// `<form id>-<position>-<name>`; the position is the field's place in
    /// the reconciled list, so two fields of the same name never collide.
    fn input_id(&self, position: usize, property: &PropertyField) -> String {
        let name = property.name().unwrap_or_default();
        format!("{}-{position}-{name}", self.core.id)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_property(
        &self,
        renderer: &mut R,
        model: &Rc<RefCell<M>>,
        field: &ResolvedField<M, R>,
        property: &PropertyField,
        input_id: &str,
        span: u8,
        shared: bool,
    ) -> Result<(), FormError> {
        let options = &self.core.options;
        let style = &options.style;
        let name = property.name().unwrap_or_default();

        if options.in_table_row {
            renderer.open_cell(property.style_of_cell());
            self.render_input(renderer, model, field, property, input_id)?;
            renderer.close_cell();
            return Ok(());
        }

        if !shared {
            renderer.open_row(&RowHints {
                key: 0,
                class: style.row_class(1),
            });
        }
        renderer.open_field(&FieldHints {
            group_class: style.group_class(span),
            label: field.attributes.display().unwrap_or(name),
            label_for: input_id,
            label_class: &style.label,
            wrapper_class: &style.wrapper,
        });
        self.render_input(renderer, model, field, property, input_id)?;
        renderer.close_field();
        if !shared {
            renderer.close_row();
        }
        Ok(())
    }

    fn render_input(
        &self,
        renderer: &mut R,
        model: &Rc<RefCell<M>>,
        field: &ResolvedField<M, R>,
        property: &PropertyField,
        input_id: &str,
    ) -> Result<(), FormError> {
        // placeholders take up space and nothing else
        let Some(descriptor) = &field.descriptor else {
            return Ok(());
        };
        let shape = descriptor.shape().ok_or_else(|| FormError::UnresolvedType {
            field: descriptor.name().to_string(),
        })?;

        let options = &self.core.options;
        let read_only = field.attributes.is_read_only() || !shape.is_supported();
        let binding = bind_with(
            descriptor,
            model,
            read_only,
            Some(self.core.notifier()),
        )?;

        if let Field::Complex(complex) = &field.field {
            let value = binding.value().clone();
            (complex.template())(
                &mut *renderer,
                &ComplexContext {
                    model,
                    input_id,
                    value: &value,
                    binding: &binding,
                },
            );
            return Ok(());
        }

        let mut flags = DispatchFlags::empty();
        if options.filter_row {
            flags |= DispatchFlags::FILTER_ROW;
        }
        if descriptor.is_read_only() {
            flags |= DispatchFlags::READ_ONLY;
        }

        let widget = if binding.mode() == BindingMode::Detached {
            debug!("{}: holder is absent, using the fallback display", descriptor.name());
            Widget::fallback()
        } else {
            select_widget(shape, &field.attributes, flags)
        };

        renderer.input(InputSlot {
            id: input_id,
            widget,
            class: &options.style.control,
            attributes: property.input_attributes(),
            validation: options
                .enable_validation
                .then(|| binding.reference().clone()),
            binding,
        });
        Ok(())
    }
}

impl<M, R> Drop for Form<M, R> {
    fn drop(&mut self) {
        if let Some(container) = &self.core.container {
            debug!("Form {} leaving its container", self.core.id);
            container.unregister_form(self.core.id);
        }
    }
}

impl<M, R> fmt::Debug for Form<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("id", &self.core.id)
            .field("options", &self.core.options)
            .field("dirty", &self.core.dirty.borrow().len())
            .field("in_container", &self.core.container.is_some())
            .finish()
    }
}

impl<M: FormModel, R: 'static> FormCore<M, R> {
    fn current_model(&self) -> Rc<RefCell<M>> {
        self.model.borrow().clone()
    }

    fn field_list(&self) -> Vec<Field<M, R>> {
        self.fields.borrow().iter().map(|(_, f)| f.clone()).collect()
    }

    fn has_unsaved_changes(&self) -> bool {
        !self.dirty.borrow().is_empty()
    }

    fn notifier(self: &Rc<Self>) -> ChangeNotifier<M> {
        let core = Rc::downgrade(self);
        Rc::new(move |id: FieldIdentifier, value: &Value, model: &M| -> Result<(), FormError> {
            let core = core.upgrade().ok_or(FormError::FormDropped)?;
            core.field_changed(id, value, model);
            Ok(())
        })
    }

    fn field_changed(&self, id: FieldIdentifier, value: &Value, model: &M) {
        trace!("Form {}: {} is dirty", self.id, id.field());
        self.dirty.borrow_mut().insert(id.clone());

        let handler = self.on_value_changed.borrow_mut().take();
        if let Some(mut handler) = handler {
            handler(&ValueChanged {
                field: id.field(),
                value,
                model,
            });
            let mut slot = self.on_value_changed.borrow_mut();
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
    }

    fn submit(&self, user_interacted: bool) -> Result<SubmitOutcome, FormError> {
        if self.busy.get() {
            debug!("Form {}: submit already running, queueing", self.id);
            self.queue.borrow_mut().push_back(user_interacted);
            return Ok(SubmitOutcome::Queued);
        }

        self.busy.set(true);
        let result = self.run(user_interacted);
        if result.is_ok() {
            self.drain_queue();
        } else {
            let dropped = self.queue.borrow_mut().drain(..).count();
            if dropped > 0 {
                warn!("Form {}: dropping {dropped} queued submit(s)", self.id);
            }
        }
        self.busy.set(false);
        result
    }

    /// Queued runs report their own failures; the caller only ever sees the
    /// outcome of the submit it asked for.
    fn drain_queue(&self) {
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(user_interacted) = next else {
                return;
            };
            trace!("Form {}: running queued submit", self.id);
            if let Err(err) = self.run(user_interacted) {
                warn!("Form {}: queued submit failed: {err}", self.id);
            }
        }
    }

    fn run(&self, user_interacted: bool) -> Result<SubmitOutcome, FormError> {
        let model = self.current_model();
        let model = model.try_borrow().map_err(|_| FormError::ModelBusy)?;

        let references = reconcile(&self.field_list(), &*model)?
            .iter()
            .filter_map(|field| field.descriptor.as_ref()?.reference())
            .collect();
        let mut validation = ValidationContext::new(references);
        let valid = match &self.validator {
            Some(validator) if self.options.enable_validation => {
                validator.validate(&model, &mut validation)
            }
            _ => true,
        };
        *self.validation.borrow_mut() = validation.clone();

        if !valid {
            if self.container.is_some() {
                debug!("{}: not valid, failing the container submit", model.type_identifier());
                return Err(FormError::validation());
            }
            warn!("{}: not valid", model.type_identifier());
            return Ok(SubmitOutcome::Invalid);
        }

        let mut changes = ChangeSet::new();
        {
            let mut dirty = self.dirty.borrow_mut();
            for id in dirty.iter() {
                if !changes.contains_key(id.field()) {
                    changes.insert(id.field().to_string(), model.read(id.field()));
                }
            }
            dirty.clear();
        }
        debug!(
            "{}: submitting {} change(s)",
            model.type_identifier(),
            changes.len()
        );

        let handler = self.on_valid_submit.borrow_mut().take();
        if let Some(mut handler) = handler {
            let result = handler(&SubmitArgs {
                model: &model,
                changes: &changes,
                validation: &validation,
                user_interacted,
            });
            let mut slot = self.on_valid_submit.borrow_mut();
            if slot.is_none() {
                *slot = Some(handler);
            }
            result.map_err(FormError::Handler)?;
        }

        Ok(SubmitOutcome::Submitted(changes))
    }
}

impl<M: FormModel, R: 'static> ContainerMember for FormCore<M, R> {
    fn form_id(&self) -> FormId {
        self.id
    }

    fn submit_from_container(&self, user_interacted: bool) -> Result<SubmitOutcome, FormError> {
        self.submit(user_interacted)
    }

    fn has_unsaved_changes(&self) -> bool {
        FormCore::has_unsaved_changes(self)
    }
}
