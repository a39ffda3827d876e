use crate::ast::{Expression, FunctionDecl, Statement};

/// Renders the AST in a fully parenthesized prefix form for diagnostics.
/// The output is lossy and is not meant to be parsed again.
pub struct AstPrinter {}

impl AstPrinter {
    pub fn new() -> AstPrinter {
        AstPrinter {}
    }
    pub fn print_program(&self, statements: &[Statement]) -> String {
        statements
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }
    pub fn print_expr(&self, expr: &Expression) -> String {
        match expr {
            Expression::Assign { name, value } => {
                self.parenthesize("=", &[name.lexeme.clone(), self.print_expr(value)])
            }
            Expression::Binary {
                left,
                operator,
                right,
            }
            | Expression::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(
                &operator.lexeme,
                &[self.print_expr(left), self.print_expr(right)],
            ),
            Expression::Call {
                callee, arguments, ..
            } => {
                let mut parts = vec![self.print_expr(callee)];
                parts.extend(arguments.iter().map(|arg| self.print_expr(arg)));
                self.parenthesize("call", &parts)
            }
            Expression::Get { object, name } => {
                self.parenthesize(".", &[self.print_expr(object), name.lexeme.clone()])
            }
            Expression::Set {
                object,
                name,
                value,
            } => {
                let target = self.parenthesize(".", &[self.print_expr(object), name.lexeme.clone()]);
                self.parenthesize("=", &[target, self.print_expr(value)])
            }
            Expression::Grouping(inner) => self.parenthesize("group", &[self.print_expr(inner)]),
            Expression::Super { method, .. } => {
                self.parenthesize("super", &[method.lexeme.clone()])
            }
            Expression::This(_) => "this".to_string(),
            Expression::Unary { operator, right } => {
                self.parenthesize(&operator.lexeme, &[self.print_expr(right)])
            }
            Expression::Variable(name) => name.lexeme.clone(),
            Expression::Boolean(x) => x.to_string(),
            Expression::Nil => "nil".to_string(),
            Expression::Number(x) => x.to_string(),
            Expression::String(x) => x.clone(),
        }
    }
    pub fn print_stmt(&self, stmt: &Statement) -> String {
        match stmt {
            Statement::Block(stmts) => {
                let parts: Vec<String> = stmts.iter().map(|s| self.print_stmt(s)).collect();
                self.parenthesize("block", &parts)
            }
            Statement::Expression(expr) => self.parenthesize(";", &[self.print_expr(expr)]),
            Statement::Print(expr) => self.parenthesize("print", &[self.print_expr(expr)]),
            Statement::Var { name, initializer } => match initializer {
                None => self.parenthesize("var", &[name.lexeme.clone()]),
                Some(x) => self.parenthesize("var", &[name.lexeme.clone(), self.print_expr(x)]),
            },
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut parts = vec![self.print_expr(condition), self.print_stmt(then_branch)];
                if let Some(x) = else_branch {
                    parts.push(self.print_stmt(x));
                }
                self.parenthesize("if", &parts)
            }
            Statement::While { condition, body } => {
                self.parenthesize("while", &[self.print_expr(condition), self.print_stmt(body)])
            }
            Statement::Function(decl) => self.print_function("fun", decl),
            Statement::Return { value, .. } => match value {
                None => "(return)".to_string(),
                Some(x) => self.parenthesize("return", &[self.print_expr(x)]),
            },
            Statement::Class {
                name,
                superclass,
                methods,
            } => {
                let mut parts = vec![name.lexeme.clone()];
                if let Some(x) = superclass {
                    parts.push("<".to_string());
                    parts.push(self.print_expr(x));
                }
                parts.extend(methods.iter().map(|m| self.print_function("method", m)));
                self.parenthesize("class", &parts)
            }
        }
    }
    fn print_function(&self, keyword: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
        let mut parts = vec![decl.name.lexeme.clone(), format!("({})", params.join(" "))];
        parts.extend(decl.body.iter().map(|s| self.print_stmt(s)));
        self.parenthesize(keyword, &parts)
    }
    fn parenthesize(&self, name: &str, args: &[String]) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push(' ');
            x.push_str(arg);
        }
        x.push(')');
        x
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        AstPrinter::new()
    }
}
