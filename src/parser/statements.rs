//! Statement-level grammar.

use crate::ast::{
    AccessModifier, AnnotationStatement, AssignmentStatement, AstVisitor, Block, BodyStatement,
    CatchStatement, ClassFieldStatement, ClassMethodStatement, ClassStatement, CommentStatement,
    ContinueLoopKind, ContinueStatement, DimStatement, DottedSetStatement, ElseIfClause,
    EndStatement, ExitForStatement, ExitWhileStatement, Expression, ExpressionStatement,
    ForEachStatement, ForStatement, FunctionExpression, FunctionStatement, GotoStatement,
    IfStatement, ImportStatement, IncrementStatement, IndexedSetStatement, LabelStatement,
    LibraryStatement, NamespaceStatement, PrintPart, PrintStatement, ReturnStatement, Statement,
    StopStatement, ThrowStatement, TryCatchStatement, WalkMode, WalkOptions, WhileStatement,
    walk_statement,
};
use crate::base::Range;
use crate::diagnostics::messages;
use crate::lexer::TokenKind;
use crate::types::{TypeKind, infer_expression_type};

use super::references::{
    AssignmentInfo, ClassDecl, ClassMemberDecl, FunctionDecl, ImportDecl, LibraryDecl, LocalVar,
    MemberKind, NamespaceDecl, ParamInfo,
};
use super::{ParseMode, Parser};

impl Parser {
    /// Top-level statements until EOF
    pub(crate) fn parse_body(&mut self) -> BodyStatement {
        let start = self.current().range;
        let mut statements = Vec::new();
        while !self.at_eof() {
            self.skip_separators();
            if self.at_eof() {
                break;
            }
            let before = self.position();
            if let Some(stmt) = self.parse_top_statement() {
                statements.push(stmt);
            }
            if self.position() == before {
                // no progress: drop the offending token
                self.unexpected_token();
                self.advance();
            }
        }
        let end = self.current().range;
        BodyStatement {
            statements,
            range: start.cover(&end),
        }
    }

    fn position(&self) -> usize {
        self.pos
    }

    /// A statement in file or namespace position
    fn parse_top_statement(&mut self) -> Option<Statement> {
        let annotations = self.parse_annotations();
        match self.kind() {
            TokenKind::Comment => self.parse_comment_statement(),
            TokenKind::Library => self.parse_library_statement(),
            TokenKind::Import => self.parse_import_statement(),
            TokenKind::Sub | TokenKind::Function
                if self.peek_kind(1) == TokenKind::Identifier
                    || (self.peek(1).is_some_and(|t| t.kind.is_identifier_like())
                        && self.peek_kind(2) == TokenKind::LeftParen) =>
            {
                self.mark_main_statement();
                self.parse_function_statement(annotations)
            }
            TokenKind::Class => {
                self.mark_main_statement();
                self.parse_class_statement(annotations)
            }
            TokenKind::Namespace => {
                self.mark_main_statement();
                self.parse_namespace_statement()
            }
            _ => {
                self.mark_main_statement();
                let stmt = self.parse_statement();
                if annotations.is_empty() {
                    stmt
                } else {
                    // annotations that decorate nothing stay in the tree
                    // as standalone statements
                    let mut statements: Vec<Statement> =
                        annotations.into_iter().map(Statement::Annotation).collect();
                    let start = statements[0].range();
                    statements.extend(stmt);
                    let end = statements.last().map(|s| s.range()).unwrap_or(start);
                    Some(Statement::Body(BodyStatement {
                        statements,
                        range: start.cover(&end),
                    }))
                }
            }
        }
    }

    /// `@name` / `@name(args)` runs decorating the next declaration
    pub(crate) fn parse_annotations(&mut self) -> Vec<AnnotationStatement> {
        let mut annotations = Vec::new();
        while self.check(TokenKind::At) && self.peek(1).is_some_and(|t| t.kind.is_identifier_like())
        {
            let at = self.advance();
            self.gate_extended("annotations", at.range);
            let Some(name) = self.expect_identifier_like() else {
                break;
            };
            let mut args = Vec::new();
            let mut end = name.range;
            if self.check(TokenKind::LeftParen) {
                self.advance();
                self.skip_newlines();
                while !self.check(TokenKind::RightParen) && !self.at_eof() {
                    if let Some(arg) = self.parse_expression() {
                        args.push(arg);
                    } else {
                        break;
                    }
                    self.skip_newlines();
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                    self.skip_newlines();
                }
                if let Some(close) = self.expect(TokenKind::RightParen) {
                    end = close.range;
                }
            }
            annotations.push(AnnotationStatement {
                name,
                args,
                range: at.range.cover(&end),
            });
            self.skip_separators();
        }
        annotations
    }

    fn parse_comment_statement(&mut self) -> Option<Statement> {
        let token = self.advance();
        let range = token.range;
        let stmt = CommentStatement {
            comments: vec![token],
            range,
        };
        // a comment block directly above a function feeds signature help
        let text = stmt.text();
        let merged = match self.take_pending_doc() {
            Some(previous) => format!("{previous}\n{text}"),
            None => text,
        };
        self.set_pending_doc(Some(merged));
        Some(Statement::Comment(stmt))
    }

    fn parse_library_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        if !self.in_file_prologue() {
            self.diagnostic(messages::library_statement_must_be_declared_at_top_of_file(
                keyword.range,
            ));
        }
        let path = self.expect(TokenKind::StringLiteral)?;
        let range = keyword.range.cover(&path.range);
        self.references_mut().library_statements.push(LibraryDecl {
            path: path.text.trim_matches('"').to_string(),
            range,
        });
        Some(Statement::Library(LibraryStatement { path, range }))
    }

    fn parse_import_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        self.gate_extended("import statements", keyword.range);
        if !self.in_file_prologue() {
            self.diagnostic(messages::import_statement_must_be_declared_at_top_of_file(
                keyword.range,
            ));
        }
        let path = self.expect(TokenKind::StringLiteral)?;
        let range = keyword.range.cover(&path.range);
        self.references_mut().import_statements.push(ImportDecl {
            path: path.text.trim_matches('"').to_string(),
            path_range: path.range,
            range,
        });
        Some(Statement::Import(ImportStatement { path, range }))
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn parse_function_statement(
        &mut self,
        annotations: Vec<AnnotationStatement>,
    ) -> Option<Statement> {
        let keyword = self.advance();
        let is_sub = keyword.kind == TokenKind::Sub;
        let name = self.expect_identifier()?;
        let doc = self.take_pending_doc();
        let func = self.parse_function_tail(is_sub, keyword.range);
        // comments inside the body never document the next declaration
        self.set_pending_doc(None);

        // only file- and namespace-level functions are callables
        if self.function_stack.is_empty() {
            let decl = FunctionDecl {
                name: name.text.to_string(),
                name_range: name.range,
                params: params_info(&func),
                return_type: return_type_of(&func, is_sub),
                is_sub,
                namespace_name: self.current_namespace(),
                func_id: func.id,
                range: func.range,
                doc,
            };
            self.references_mut().function_statements.push(decl);
        }

        let range = func.range;
        Some(Statement::Function(FunctionStatement {
            name,
            func,
            annotations,
            range,
        }))
    }

    /// Everything after `sub name` / `function name`: parameters, return
    /// type, body, and terminator. Shared with anonymous function
    /// expressions and class methods.
    pub(crate) fn parse_function_tail(&mut self, is_sub: bool, start: Range) -> FunctionExpression {
        let id = self.allocate_function_id();
        let parent_id = self.current_function_id();
        self.function_stack.push(id);

        let mut parameters = Vec::new();
        if self.expect(TokenKind::LeftParen).is_some() {
            self.skip_newlines();
            while !self.check(TokenKind::RightParen) && !self.at_eof() {
                if let Some(parameter) = self.parse_function_parameter(id) {
                    parameters.push(parameter);
                } else {
                    break;
                }
                self.skip_newlines();
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
                self.skip_newlines();
            }
            self.expect(TokenKind::RightParen);
        }

        let return_type = if self.eat(TokenKind::As).is_some() {
            self.parse_type_expression()
        } else {
            None
        };

        // typedef declarations carry no bodies
        let (body, end_token) = if self.mode() == ParseMode::Typedef {
            (Block::default(), None)
        } else {
            let terminators = [TokenKind::EndSub, TokenKind::EndFunction];
            let body = self.parse_block(&terminators);
            let end_token = if self.check(TokenKind::EndSub) || self.check(TokenKind::EndFunction)
            {
                Some(self.advance())
            } else {
                let expected = if is_sub { "'end sub'" } else { "'end function'" };
                let found = crate::lexer::kind_to_name(self.kind());
                let range = self.current().range;
                self.diagnostic(messages::expected_token(expected, found, range));
                None
            };
            (body, end_token)
        };

        self.function_stack.pop();
        let end = end_token.map(|t| t.range).unwrap_or(body.range);
        let range = start.cover(&end);
        self.references_mut()
            .function_expressions
            .push(super::references::FunctionExprInfo {
                id,
                parent_id,
                range,
            });
        FunctionExpression {
            id,
            is_sub,
            parameters,
            return_type,
            body,
            range,
        }
    }

    fn parse_function_parameter(
        &mut self,
        function_id: u32,
    ) -> Option<crate::ast::FunctionParameter> {
        let name = self.expect_identifier()?;
        let mut range = name.range;
        let default_value = if self.eat(TokenKind::Equal).is_some() {
            let value = self.parse_expression()?;
            range = range.cover(&value.range());
            Some(value)
        } else {
            None
        };
        let type_expression = if self.eat(TokenKind::As).is_some() {
            let ty = self.parse_type_expression();
            if let Some(ty) = &ty {
                range = range.cover(&ty.range);
            }
            ty
        } else {
            None
        };

        let type_kind = declared_param_type(&name.text, &type_expression, default_value.as_ref());
        self.references_mut().add_local_var(
            function_id,
            LocalVar {
                name: name.text.to_string(),
                name_range: name.range,
                type_kind,
            },
        );
        Some(crate::ast::FunctionParameter {
            name,
            type_expression,
            default_value: default_value.map(Box::new),
            range,
        })
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn parse_class_statement(&mut self, annotations: Vec<AnnotationStatement>) -> Option<Statement> {
        let keyword = self.advance();
        self.gate_extended("classes", keyword.range);
        let name = self.expect_identifier()?;

        // `extends` is contextual, not reserved
        let parent_class = if self.check(TokenKind::Identifier)
            && self.current().text.eq_ignore_ascii_case("extends")
        {
            self.advance();
            self.parse_namespaced_name()
        } else {
            None
        };

        let mut members = Vec::new();
        let mut member_decls: Vec<ClassMemberDecl> = Vec::new();
        let mut constructor_calls_super = false;
        let mut has_constructor = false;

        self.skip_separators();
        while !self.check(TokenKind::EndClass) && !self.at_eof() {
            let before = self.position();
            let member_annotations = self.parse_annotations();
            if self.check(TokenKind::Comment) {
                let token = self.advance();
                let range = token.range;
                members.push(Statement::Comment(CommentStatement {
                    comments: vec![token],
                    range,
                }));
                self.skip_separators();
                continue;
            }
            if self.check(TokenKind::EndClass) {
                break;
            }

            let access = match self.kind() {
                TokenKind::Public => {
                    self.advance();
                    AccessModifier::Public
                }
                TokenKind::Protected => {
                    self.advance();
                    AccessModifier::Protected
                }
                TokenKind::Private => {
                    self.advance();
                    AccessModifier::Private
                }
                _ => AccessModifier::Public,
            };
            let override_token = self.eat(TokenKind::Override);

            if matches!(self.kind(), TokenKind::Sub | TokenKind::Function) {
                let method_keyword = self.advance();
                let is_sub = method_keyword.kind == TokenKind::Sub;
                if let Some(method_name) = self.expect_identifier_like() {
                    let mut func = self.parse_function_tail(is_sub, method_keyword.range);
                    let is_constructor = method_name.text.eq_ignore_ascii_case("new");
                    if is_constructor {
                        has_constructor = true;
                        constructor_calls_super = body_calls_super(&mut func);
                    }
                    member_decls.push(ClassMemberDecl {
                        name: method_name.text.to_string(),
                        name_range: method_name.range,
                        kind: MemberKind::Method,
                        access,
                        is_override: override_token.is_some(),
                        member_type: return_type_of(&func, is_sub),
                        params: params_info(&func),
                        func_id: Some(func.id),
                        range: func.range,
                    });
                    let range = func.range;
                    members.push(Statement::ClassMethod(ClassMethodStatement {
                        access,
                        is_override: override_token.is_some(),
                        name: method_name,
                        func,
                        annotations: member_annotations,
                        range,
                    }));
                }
            } else if self.current().kind.is_identifier_like() {
                let field_name = self.advance();
                let mut range = field_name.range;
                let type_expression = if self.eat(TokenKind::As).is_some() {
                    let ty = self.parse_type_expression();
                    if let Some(ty) = &ty {
                        range = range.cover(&ty.range);
                    }
                    ty
                } else {
                    None
                };
                let initial_value = if self.eat(TokenKind::Equal).is_some() {
                    let value = self.parse_expression();
                    if let Some(value) = &value {
                        range = range.cover(&value.range());
                    }
                    value
                } else {
                    None
                };

                member_decls.push(ClassMemberDecl {
                    name: field_name.text.to_string(),
                    name_range: field_name.range,
                    kind: MemberKind::Field,
                    access,
                    is_override: false,
                    member_type: field_type(&type_expression, &initial_value),
                    params: Vec::new(),
                    func_id: None,
                    range,
                });
                members.push(Statement::ClassField(ClassFieldStatement {
                    access,
                    name: field_name,
                    type_expression,
                    initial_value,
                    annotations: member_annotations,
                    range,
                }));
            } else {
                self.unexpected_token();
                self.synchronize();
            }

            self.skip_separators();
            if self.position() == before {
                self.advance();
            }
        }
        let end = self
            .expect(TokenKind::EndClass)
            .map(|t| t.range)
            .unwrap_or(name.range);
        let range = keyword.range.cover(&end);

        let namespace_name = self.current_namespace();
        self.references_mut().class_statements.push(ClassDecl {
            name: name.text.to_string(),
            name_range: name.range,
            parent_name: parent_class.as_ref().map(|p| p.text()),
            parent_name_range: parent_class.as_ref().map(|p| p.range),
            namespace_name,
            members: member_decls,
            has_constructor,
            constructor_calls_super,
            range,
        });

        Some(Statement::Class(ClassStatement {
            name,
            parent_class,
            members,
            annotations,
            range,
        }))
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    fn parse_namespace_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        self.gate_extended("namespaces", keyword.range);
        let name = self.parse_namespaced_name()?;

        let full_name = match self.current_namespace() {
            Some(outer) => format!("{outer}.{}", name.text()),
            None => name.text(),
        };
        self.references_mut()
            .namespace_statements
            .push(NamespaceDecl {
                name: full_name.clone(),
                name_range: name.range,
                range: keyword.range,
            });
        self.namespace_stack.push(full_name);

        let mut body = Vec::new();
        self.skip_separators();
        while !self.check(TokenKind::EndNamespace) && !self.at_eof() {
            let before = self.position();
            if let Some(stmt) = self.parse_top_statement() {
                body.push(stmt);
            }
            self.skip_separators();
            if self.position() == before {
                self.advance();
            }
        }
        self.namespace_stack.pop();

        let end = self
            .expect(TokenKind::EndNamespace)
            .map(|t| t.range)
            .unwrap_or(name.range);
        Some(Statement::Namespace(NamespaceStatement {
            name,
            body,
            range: keyword.range.cover(&end),
        }))
    }

    // =========================================================================
    // Blocks and in-function statements
    // =========================================================================

    /// Parse statements until one of `terminators` (which is left in
    /// place) or EOF
    pub(crate) fn parse_block(&mut self, terminators: &[TokenKind]) -> Block {
        let start = self.current().range;
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if terminators.contains(&self.kind()) || self.at_eof() {
                break;
            }
            let before = self.position();
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            } else {
                self.synchronize();
            }
            if !self.at_separator() && !terminators.contains(&self.kind()) {
                self.unexpected_token();
                self.synchronize();
            }
            if self.position() == before {
                self.advance();
            }
        }
        let end = self.current().range;
        Block {
            statements,
            range: start.cover(&end),
        }
    }

    pub(crate) fn parse_statement(&mut self) -> Option<Statement> {
        match self.kind() {
            TokenKind::Comment => self.parse_comment_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::ForEach => self.parse_for_each_statement(),
            TokenKind::Print | TokenKind::Question => self.parse_print_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Goto => self.parse_goto_statement(),
            TokenKind::Dim => self.parse_dim_statement(),
            TokenKind::Stop => {
                let token = self.advance();
                Some(Statement::Stop(StopStatement { range: token.range }))
            }
            TokenKind::End => {
                let token = self.advance();
                Some(Statement::End(EndStatement { range: token.range }))
            }
            TokenKind::ExitFor => {
                let token = self.advance();
                Some(Statement::ExitFor(ExitForStatement { range: token.range }))
            }
            TokenKind::ExitWhile => {
                let token = self.advance();
                Some(Statement::ExitWhile(ExitWhileStatement {
                    range: token.range,
                }))
            }
            TokenKind::ContinueFor => {
                let token = self.advance();
                Some(Statement::Continue(ContinueStatement {
                    loop_kind: ContinueLoopKind::For,
                    range: token.range,
                }))
            }
            TokenKind::ContinueWhile => {
                let token = self.advance();
                Some(Statement::Continue(ContinueStatement {
                    loop_kind: ContinueLoopKind::While,
                    range: token.range,
                }))
            }
            TokenKind::Try => self.parse_try_catch_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Sub | TokenKind::Function => {
                // named function statements nest syntactically; anonymous
                // ones are expression statements
                if self.peek_kind(1) == TokenKind::Identifier {
                    self.parse_function_statement(Vec::new())
                } else {
                    self.parse_assignment_or_expression()
                }
            }
            TokenKind::Identifier
                if self.peek_kind(1) == TokenKind::Colon
                    && matches!(self.peek_kind(2), TokenKind::Newline | TokenKind::Eof) =>
            {
                let name = self.advance();
                let colon = self.advance();
                Some(Statement::Label(LabelStatement {
                    range: name.range.cover(&colon.range),
                    name,
                }))
            }
            _ => self.parse_assignment_or_expression(),
        }
    }

    fn parse_if_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let has_then_token = self.eat(TokenKind::Then).is_some();

        if self.check(TokenKind::Newline) {
            // block form
            let then_branch =
                self.parse_block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf]);
            let mut else_ifs = Vec::new();
            while self.check(TokenKind::ElseIf) {
                let clause_start = self.advance().range;
                let Some(clause_condition) = self.parse_expression() else {
                    break;
                };
                self.eat(TokenKind::Then);
                let block =
                    self.parse_block(&[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf]);
                let clause_range = clause_start.cover(&block.range);
                else_ifs.push(ElseIfClause {
                    condition: clause_condition,
                    block,
                    range: clause_range,
                });
            }
            let else_branch = if self.eat(TokenKind::Else).is_some() {
                Some(self.parse_block(&[TokenKind::EndIf]))
            } else {
                None
            };
            let end = self
                .expect(TokenKind::EndIf)
                .map(|t| t.range)
                .unwrap_or(then_branch.range);
            Some(Statement::If(IfStatement {
                condition,
                has_then_token,
                then_branch,
                else_ifs,
                else_branch,
                range: keyword.range.cover(&end),
            }))
        } else {
            // single-line form: colon-separated statements, optional
            // `else`, optional trailing `end if`
            let then_branch = self.parse_inline_branch(&[TokenKind::Else, TokenKind::EndIf]);
            let else_branch = if self.eat(TokenKind::Else).is_some() {
                Some(self.parse_inline_branch(&[TokenKind::EndIf]))
            } else {
                None
            };
            let end = self
                .eat(TokenKind::EndIf)
                .map(|t| t.range)
                .unwrap_or(then_branch.range);
            Some(Statement::If(IfStatement {
                condition,
                has_then_token,
                then_branch,
                else_ifs: Vec::new(),
                else_branch,
                range: keyword.range.cover(&end),
            }))
        }
    }

    /// Statements on the same line, colon-separated, until a stop token or
    /// the end of the line
    fn parse_inline_branch(&mut self, stops: &[TokenKind]) -> Block {
        let start = self.current().range;
        let mut statements = Vec::new();
        loop {
            while self.check(TokenKind::Colon) {
                self.advance();
            }
            if stops.contains(&self.kind())
                || matches!(self.kind(), TokenKind::Newline | TokenKind::Eof)
            {
                break;
            }
            let before = self.position();
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            if self.position() == before {
                break;
            }
        }
        let end = self.current().range;
        Block {
            statements,
            range: start.cover(&end),
        }
    }

    fn parse_while_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_block(&[TokenKind::EndWhile]);
        let end = self
            .expect(TokenKind::EndWhile)
            .map(|t| t.range)
            .unwrap_or(body.range);
        Some(Statement::While(WhileStatement {
            condition,
            body,
            range: keyword.range.cover(&end),
        }))
    }

    fn parse_for_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let counter = self.expect_identifier()?;
        self.expect(TokenKind::Equal);
        let start_value = self.parse_expression()?;
        self.expect(TokenKind::To);
        let end_value = self.parse_expression()?;
        let step = if self.eat(TokenKind::Step).is_some() {
            self.parse_expression()
        } else {
            None
        };
        if let Some(function_id) = self.current_function_id() {
            self.references_mut().add_local_var(
                function_id,
                LocalVar {
                    name: counter.text.to_string(),
                    name_range: counter.range,
                    type_kind: TypeKind::Integer,
                },
            );
        }
        let body = self.parse_block(&[TokenKind::EndFor, TokenKind::Next]);
        let end = self.parse_loop_end(TokenKind::EndFor, body.range);
        Some(Statement::For(ForStatement {
            counter,
            start: start_value,
            end: end_value,
            step,
            body,
            range: keyword.range.cover(&end),
        }))
    }

    fn parse_for_each_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let item = self.expect_identifier()?;
        self.expect(TokenKind::In);
        let target = self.parse_expression()?;
        if let Some(function_id) = self.current_function_id() {
            self.references_mut().add_local_var(
                function_id,
                LocalVar {
                    name: item.text.to_string(),
                    name_range: item.range,
                    type_kind: TypeKind::Dynamic,
                },
            );
        }
        let body = self.parse_block(&[TokenKind::EndFor, TokenKind::Next]);
        let end = self.parse_loop_end(TokenKind::EndFor, body.range);
        Some(Statement::ForEach(ForEachStatement {
            item,
            target,
            body,
            range: keyword.range.cover(&end),
        }))
    }

    /// `end for` or legacy `next [counter]`
    fn parse_loop_end(&mut self, end_kind: TokenKind, fallback: Range) -> Range {
        if let Some(token) = self.eat(end_kind) {
            token.range
        } else if let Some(token) = self.eat(TokenKind::Next) {
            let mut range = token.range;
            if self.check(TokenKind::Identifier) {
                range = range.cover(&self.advance().range);
            }
            range
        } else {
            let found = crate::lexer::kind_to_name(self.kind());
            let range = self.current().range;
            self.diagnostic(messages::expected_token("'end for'", found, range));
            fallback
        }
    }

    fn parse_print_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let mut parts = Vec::new();
        let mut end = keyword.range;
        while !self.at_separator() {
            match self.kind() {
                TokenKind::Semicolon => {
                    let token = self.advance();
                    end = token.range;
                    parts.push(PrintPart::Semicolon(token.range));
                }
                TokenKind::Comma => {
                    let token = self.advance();
                    end = token.range;
                    parts.push(PrintPart::Comma(token.range));
                }
                _ => {
                    let Some(expr) = self.parse_expression() else {
                        break;
                    };
                    end = expr.range();
                    parts.push(PrintPart::Expression(expr));
                }
            }
        }
        Some(Statement::Print(PrintStatement {
            parts,
            range: keyword.range.cover(&end),
        }))
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let value = if self.at_separator() || self.check(TokenKind::EndIf) {
            None
        } else {
            self.parse_expression()
        };
        let end = value.as_ref().map(|v| v.range()).unwrap_or(keyword.range);
        Some(Statement::Return(ReturnStatement {
            value,
            range: keyword.range.cover(&end),
        }))
    }

    fn parse_goto_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let label = self.expect_identifier()?;
        Some(Statement::Goto(GotoStatement {
            range: keyword.range.cover(&label.range),
            label,
        }))
    }

    fn parse_dim_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        let name = self.expect_identifier()?;
        let mut dimensions = Vec::new();
        let mut end = name.range;
        if self.expect(TokenKind::LeftBracket).is_some() {
            while !self.check(TokenKind::RightBracket) && !self.at_eof() {
                if let Some(dim) = self.parse_expression() {
                    dimensions.push(dim);
                } else {
                    break;
                }
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            if let Some(close) = self.expect(TokenKind::RightBracket) {
                end = close.range;
            }
        }
        if let Some(function_id) = self.current_function_id() {
            self.references_mut().add_local_var(
                function_id,
                LocalVar {
                    name: name.text.to_string(),
                    name_range: name.range,
                    type_kind: TypeKind::Object,
                },
            );
        }
        Some(Statement::Dim(DimStatement {
            name,
            dimensions,
            range: keyword.range.cover(&end),
        }))
    }

    fn parse_try_catch_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        self.gate_extended("try/catch", keyword.range);
        let try_block = self.parse_block(&[TokenKind::Catch, TokenKind::EndTry]);
        let catch = if self.check(TokenKind::Catch) {
            let catch_keyword = self.advance();
            let exception_var = self
                .expect_identifier()
                .unwrap_or_else(|| crate::lexer::Token::new(
                    TokenKind::Identifier,
                    "e",
                    catch_keyword.range,
                ));
            if let Some(function_id) = self.current_function_id() {
                self.references_mut().add_local_var(
                    function_id,
                    LocalVar {
                        name: exception_var.text.to_string(),
                        name_range: exception_var.range,
                        type_kind: TypeKind::Object,
                    },
                );
            }
            let block = self.parse_block(&[TokenKind::EndTry]);
            let range = catch_keyword.range.cover(&block.range);
            Some(Box::new(CatchStatement {
                exception_var,
                block,
                range,
            }))
        } else {
            self.diagnostic(messages::expected_catch(keyword.range));
            None
        };
        let end = self
            .expect(TokenKind::EndTry)
            .map(|t| t.range)
            .unwrap_or(try_block.range);
        Some(Statement::TryCatch(TryCatchStatement {
            try_block,
            catch,
            range: keyword.range.cover(&end),
        }))
    }

    fn parse_throw_statement(&mut self) -> Option<Statement> {
        let keyword = self.advance();
        self.gate_extended("throw", keyword.range);
        let value = self.parse_expression()?;
        let range = keyword.range.cover(&value.range());
        Some(Statement::Throw(ThrowStatement { value, range }))
    }

    /// Statements that begin with an expression: assignment (all
    /// operators), dotted/indexed set, increment, or a bare call
    fn parse_assignment_or_expression(&mut self) -> Option<Statement> {
        let target = self.parse_postfix_expression()?;

        if self.current().kind.is_assignment_operator() {
            let operator = self.advance();
            let value = self.parse_expression()?;
            let range = target.range().cover(&value.range());
            return match target {
                Expression::Variable(variable) => {
                    let inferred = infer_expression_type(&value);
                    let function_id = self.current_function_id();
                    self.references_mut()
                        .assignment_statements
                        .push(AssignmentInfo {
                            name: variable.name.text.to_string(),
                            name_range: variable.name.range,
                            inferred_type: inferred.clone(),
                            function_id,
                        });
                    if let Some(function_id) = function_id {
                        self.references_mut().add_local_var(
                            function_id,
                            LocalVar {
                                name: variable.name.text.to_string(),
                                name_range: variable.name.range,
                                type_kind: inferred,
                            },
                        );
                    }
                    Some(Statement::Assignment(AssignmentStatement {
                        name: variable.name,
                        operator,
                        value,
                        range,
                    }))
                }
                Expression::DottedGet(get) => {
                    Some(Statement::DottedSet(DottedSetStatement {
                        obj: *get.obj,
                        name: get.name,
                        operator,
                        value,
                        range,
                    }))
                }
                Expression::IndexedGet(get) => {
                    Some(Statement::IndexedSet(IndexedSetStatement {
                        obj: *get.obj,
                        index: *get.index,
                        operator,
                        value,
                        range,
                    }))
                }
                other => {
                    self.diagnostic(messages::unexpected_token("=", other.range()));
                    None
                }
            };
        }

        if matches!(self.kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let operator = self.advance();
            let range = target.range().cover(&operator.range);
            return Some(Statement::Increment(IncrementStatement {
                target,
                operator,
                range,
            }));
        }

        let range = target.range();
        Some(Statement::Expression(ExpressionStatement {
            expression: target,
            range,
        }))
    }
}

// ============================================================================
// Declaration helpers
// ============================================================================

/// Type implied by an identifier's trailing designator
fn type_from_designator(name: &str) -> Option<TypeKind> {
    match name.as_bytes().last() {
        Some(b'$') => Some(TypeKind::String),
        Some(b'%') => Some(TypeKind::Integer),
        Some(b'!') => Some(TypeKind::Float),
        Some(b'#') => Some(TypeKind::Double),
        Some(b'&') => Some(TypeKind::LongInteger),
        _ => None,
    }
}

fn declared_param_type(
    name: &str,
    type_expression: &Option<crate::ast::TypeExpression>,
    default_value: Option<&Expression>,
) -> TypeKind {
    if let Some(ty) = type_expression {
        return TypeKind::from_type_name(&ty.text());
    }
    if let Some(designator) = type_from_designator(name) {
        return designator;
    }
    if let Some(value) = default_value {
        let inferred = infer_expression_type(value);
        if inferred != TypeKind::Invalid {
            return inferred;
        }
    }
    TypeKind::Dynamic
}

fn params_info(func: &FunctionExpression) -> Vec<ParamInfo> {
    func.parameters
        .iter()
        .map(|p| ParamInfo {
            name: p.name.text.to_string(),
            type_kind: declared_param_type(
                &p.name.text,
                &p.type_expression,
                p.default_value.as_deref(),
            ),
            is_optional: p.is_optional(),
            is_rest_argument: false,
            range: p.range,
        })
        .collect()
}

fn return_type_of(func: &FunctionExpression, is_sub: bool) -> TypeKind {
    match &func.return_type {
        Some(ty) => TypeKind::from_type_name(&ty.text()),
        None if is_sub => TypeKind::Void,
        None => TypeKind::Dynamic,
    }
}

/// A field initialised to `invalid` has declared type dynamic
fn field_type(
    type_expression: &Option<crate::ast::TypeExpression>,
    initial_value: &Option<Expression>,
) -> TypeKind {
    if let Some(ty) = type_expression {
        return TypeKind::from_type_name(&ty.text());
    }
    match initial_value {
        Some(value) => match infer_expression_type(value) {
            TypeKind::Invalid => TypeKind::Dynamic,
            inferred => inferred,
        },
        None => TypeKind::Dynamic,
    }
}

struct SuperCallFinder {
    found: bool,
}

impl AstVisitor for SuperCallFinder {
    fn visit_expression(&mut self, expr: &mut Expression) -> Option<Expression> {
        if let Expression::Call(call) = expr {
            if let Expression::Variable(callee) = call.callee.as_ref() {
                if callee.name.text.eq_ignore_ascii_case("super") {
                    self.found = true;
                }
            }
        }
        None
    }
}

/// Does the constructor body contain a direct `super(...)` call?
fn body_calls_super(func: &mut FunctionExpression) -> bool {
    let mut finder = SuperCallFinder { found: false };
    let options = WalkOptions::new(
        WalkMode::VISIT_EXPRESSIONS | WalkMode::WALK_EXPRESSIONS | WalkMode::WALK_STATEMENTS,
    );
    for stmt in &mut func.body.statements {
        walk_statement(stmt, &mut finder, &options);
        if finder.found {
            return true;
        }
    }
    finder.found
}
